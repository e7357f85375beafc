//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Lift a slice reducer into a parent state, action and environment
//!
//! Together they build a single process-wide reducer out of independent slices,
//! each living under its own field of the root state.
//!
//! # Examples
//!
//! ```
//! use todo_query_core::composition::{combine_reducers, scope_reducer};
//! use todo_query_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! #[derive(Clone, Default)]
//! struct TextState {
//!     text: String,
//! }
//!
//! #[derive(Clone)]
//! enum TextAction {
//!     Set(String),
//! }
//!
//! #[derive(Clone)]
//! struct TextReducer;
//!
//! impl Reducer for TextReducer {
//!     type State = TextState;
//!     type Action = TextAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut TextState, action: TextAction, _env: &()) -> SmallVec<[Effect<TextAction>; 4]> {
//!         let TextAction::Set(text) = action;
//!         state.text = text;
//!         SmallVec::new()
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Root {
//!     text: TextState,
//! }
//!
//! #[derive(Clone)]
//! enum RootAction {
//!     Text(TextAction),
//! }
//!
//! let text = scope_reducer(
//!     TextReducer,
//!     |root: &mut Root| &mut root.text,
//!     |action: RootAction| match action {
//!         RootAction::Text(a) => Some(a),
//!     },
//!     RootAction::Text,
//!     |env: &()| env,
//! );
//!
//! let root = combine_reducers(vec![std::sync::Arc::new(text)]);
//! let mut state = Root::default();
//! let _ = root.reduce(&mut state, RootAction::Text(TextAction::Set("milk".into())), &());
//! assert_eq!(state.text.text, "milk");
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;
use std::sync::Arc;

/// A shared, thread-safe reducer trait object
pub type SharedReducer<S, A, E> = Arc<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<SharedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<SharedReducer<S, A, E>>,
}

impl<S, A, E> Clone for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    fn clone(&self) -> Self {
        Self {
            reducers: self.reducers.iter().map(Arc::clone).collect(),
        }
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Scopes a slice reducer to a field of a larger state.
///
/// The parent action is offered to `extract_action`; actions that do not belong
/// to the slice are ignored. Effects produced by the slice are mapped back into
/// the parent action type with `embed_action`, and the slice sees only the part
/// of the environment returned by `get_env`.
///
/// # Type Parameters
///
/// - `S`, `A`, `E`: The parent state, action and environment
/// - `SubS`, `SubA`, `SubE`: The slice state, action and environment
/// - `R`: The slice reducer
pub fn scope_reducer<S, SubS, A, SubA, E, SubE, R>(
    reducer: R,
    state_mut: fn(&mut S) -> &mut SubS,
    extract_action: fn(A) -> Option<SubA>,
    embed_action: fn(SubA) -> A,
    get_env: fn(&E) -> &SubE,
) -> ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = SubE>,
{
    ScopedReducer {
        reducer,
        state_mut,
        extract_action,
        embed_action,
        get_env,
    }
}

/// A reducer lifted into a parent state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = SubE>,
{
    reducer: R,
    state_mut: fn(&mut S) -> &mut SubS,
    extract_action: fn(A) -> Option<SubA>,
    embed_action: fn(SubA) -> A,
    get_env: fn(&E) -> &SubE,
}

impl<S, SubS, A, SubA, E, SubE, R> Clone for ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = SubE> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            state_mut: self.state_mut,
            extract_action: self.extract_action,
            embed_action: self.embed_action,
            get_env: self.get_env,
        }
    }
}

impl<S, SubS, A, SubA, E, SubE, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, SubE, R>
where
    A: Send + 'static,
    SubA: Send + 'static,
    R: Reducer<State = SubS, Action = SubA, Environment = SubE>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(sub_action) = (self.extract_action)(action) else {
            return SmallVec::new();
        };

        let sub_state = (self.state_mut)(state);
        let sub_env = (self.get_env)(env);
        let embed = self.embed_action;

        self.reducer
            .reduce(sub_state, sub_action, sub_env)
            .into_iter()
            .map(|effect| effect.map(embed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone)]
    enum TestAction {
        Increment,
        Decrement,
        SetName(String),
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => state.counter += 1,
                TestAction::Decrement => state.counter -= 1,
                TestAction::SetName(_) => {},
            }
            SmallVec::new()
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            if let TestAction::SetName(name) = action {
                state.name = name;
            }
            SmallVec::new()
        }
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combine_reducers(vec![Arc::new(CounterReducer), Arc::new(NameReducer)]);

        let mut state = TestState::default();

        let _ = combined.reduce(&mut state, TestAction::Increment, &());
        assert_eq!(state.counter, 1);

        let _ = combined.reduce(&mut state, TestAction::SetName("Alice".to_string()), &());
        assert_eq!(state.name, "Alice");

        let _ = combined.reduce(&mut state, TestAction::Decrement, &());
        assert_eq!(state.counter, 0);
        assert_eq!(state.name, "Alice");
    }

    // Scoped reducer tests
    #[derive(Clone, Default)]
    struct SubState {
        value: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum SubAction {
        Add(i32),
        AddLater(i32),
    }

    #[derive(Clone)]
    struct SubReducer;

    impl Reducer for SubReducer {
        type State = SubState;
        type Action = SubAction;
        type Environment = Duration;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                SubAction::Add(n) => {
                    state.value += n;
                    SmallVec::new()
                },
                SubAction::AddLater(n) => smallvec![Effect::Delay {
                    duration: *env,
                    action: Box::new(SubAction::Add(n)),
                }],
            }
        }
    }

    #[derive(Clone, Default)]
    struct ParentState {
        sub: SubState,
        other: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Sub(SubAction),
        Other,
    }

    struct ParentEnv {
        delay: Duration,
    }

    fn scoped() -> ScopedReducer<ParentState, SubState, ParentAction, SubAction, ParentEnv, Duration, SubReducer> {
        scope_reducer(
            SubReducer,
            |parent: &mut ParentState| &mut parent.sub,
            |action: ParentAction| match action {
                ParentAction::Sub(a) => Some(a),
                ParentAction::Other => None,
            },
            ParentAction::Sub,
            |env: &ParentEnv| &env.delay,
        )
    }

    #[test]
    fn test_scope_reducer_updates_slice_only() {
        let env = ParentEnv {
            delay: Duration::from_millis(1),
        };
        let mut state = ParentState {
            sub: SubState { value: 5 },
            other: "test".to_string(),
        };

        let _ = scoped().reduce(&mut state, ParentAction::Sub(SubAction::Add(3)), &env);
        assert_eq!(state.sub.value, 8);
        assert_eq!(state.other, "test");

        let effects = scoped().reduce(&mut state, ParentAction::Other, &env);
        assert!(effects.is_empty());
        assert_eq!(state.sub.value, 8);
    }

    #[test]
    fn test_scope_reducer_lifts_effects() {
        let env = ParentEnv {
            delay: Duration::from_millis(25),
        };
        let mut state = ParentState::default();

        let effects = scoped().reduce(&mut state, ParentAction::Sub(SubAction::AddLater(2)), &env);

        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Delay { duration, action } => {
                assert_eq!(*duration, Duration::from_millis(25));
                assert_eq!(**action, ParentAction::Sub(SubAction::Add(2)));
            },
            other => unreachable!("unexpected effect {other:?}"),
        }
    }
}
