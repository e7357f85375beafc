//! Local state for the new-todo text box.

use todo_query_core::{effect::Effect, reducer::Reducer, SmallVec};

/// Contents of the new-todo input
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBoxState {
    /// Current text, empty initially
    pub todo_text: String,
}

/// Text box actions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextBoxAction {
    /// Replace the whole text
    SetTextBox(String),
}

/// Reducer for the text box; never produces effects
#[derive(Clone, Copy, Debug, Default)]
pub struct TextBoxReducer;

impl Reducer for TextBoxReducer {
    type State = TextBoxState;
    type Action = TextBoxAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TextBoxAction::SetTextBox(text) => state.todo_text = text,
        }
        SmallVec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_query_testing::{assertions, ReducerTest};

    #[test]
    fn set_replaces_text() {
        ReducerTest::new(TextBoxReducer)
            .with_env(())
            .given_state(TextBoxState {
                todo_text: "mil".into(),
            })
            .when_action(TextBoxAction::SetTextBox("milk".into()))
            .then_state(|state| assert_eq!(state.todo_text, "milk"))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn set_empty_clears() {
        ReducerTest::new(TextBoxReducer)
            .with_env(())
            .given_state(TextBoxState {
                todo_text: "milk".into(),
            })
            .when_action(TextBoxAction::SetTextBox(String::new()))
            .then_state(|state| assert!(state.todo_text.is_empty()))
            .run();
    }
}
