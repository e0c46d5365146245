use std::collections::HashSet;

use tracing::debug;

use crate::hid::{GestureAction, HidCommand, KeyName};
use crate::types::{GestureEvent, GestureSymbol, Transition};

/// Tabla gesto -> acción y teclas actualmente mantenidas.
///
/// Una tecla se presiona cuando su gesto aparece y se suelta cuando
/// desaparece; una tecla ya presionada no se vuelve a presionar. Los clicks
/// sólo se disparan al aparecer.
#[derive(Debug, Clone, Default)]
pub struct ActionBindings {
    actions: [Option<GestureAction>; GestureSymbol::COUNT],
    held: HashSet<KeyName>,
}

impl ActionBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puño abajo, palma arriba, swipes a los lados
    pub fn arrows() -> Self {
        let mut bindings = Self::new();
        bindings.bind(GestureSymbol::Fist, GestureAction::Key(KeyName::Down));
        bindings.bind(GestureSymbol::OpenPalm, GestureAction::Key(KeyName::Up));
        bindings.bind(GestureSymbol::LeftSwipe, GestureAction::Key(KeyName::Left));
        bindings.bind(GestureSymbol::RightSwipe, GestureAction::Key(KeyName::Right));
        bindings
    }

    pub fn bind(&mut self, symbol: GestureSymbol, action: GestureAction) {
        self.actions[symbol.index()] = Some(action);
    }

    pub fn action(&self, symbol: GestureSymbol) -> Option<GestureAction> {
        self.actions[symbol.index()]
    }

    /// Gestos con acción, en orden de declaración
    pub fn bound(&self) -> impl Iterator<Item = (GestureSymbol, GestureAction)> + '_ {
        GestureSymbol::ALL
            .iter()
            .filter_map(move |&g| self.action(g).map(|a| (g, a)))
    }

    pub fn is_held(&self, key: KeyName) -> bool {
        self.held.contains(&key)
    }

    /// Traduce un evento del motor en la orden HID que corresponda
    pub fn handle(&mut self, event: &GestureEvent) -> Option<HidCommand> {
        let action = self.action(event.symbol)?;
        let command = match (action, event.transition) {
            (GestureAction::Key(key), Transition::Appear) => {
                self.held.insert(key).then_some(HidCommand::Press(key))
            }
            (GestureAction::Key(key), Transition::Disappear) => {
                self.held.remove(&key).then_some(HidCommand::Release(key))
            }
            (GestureAction::Click(button), Transition::Appear) => Some(HidCommand::Click(button)),
            (GestureAction::Click(_), Transition::Disappear) => None,
        };
        if command.is_none() {
            debug!(symbol = %event.symbol, transition = %event.transition, "sin acción HID");
        }
        command
    }

    /// Suelta todo lo que quede presionado (al salir)
    pub fn release_all(&mut self) -> Vec<HidCommand> {
        let mut keys: Vec<KeyName> = self.held.drain().collect();
        keys.sort_by_key(|k| k.as_str());
        keys.into_iter().map(HidCommand::Release).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::MouseButton;

    fn ev(symbol: GestureSymbol, transition: Transition) -> GestureEvent {
        GestureEvent {
            symbol,
            transition,
            frame: None,
        }
    }

    #[test]
    fn test_press_on_appear_release_on_disappear() {
        let mut bindings = ActionBindings::arrows();
        assert_eq!(
            bindings.handle(&ev(GestureSymbol::Fist, Transition::Appear)),
            Some(HidCommand::Press(KeyName::Down))
        );
        assert!(bindings.is_held(KeyName::Down));
        assert_eq!(
            bindings.handle(&ev(GestureSymbol::Fist, Transition::Disappear)),
            Some(HidCommand::Release(KeyName::Down))
        );
        assert!(!bindings.is_held(KeyName::Down));
    }

    #[test]
    fn test_held_key_not_pressed_twice() {
        let mut bindings = ActionBindings::new();
        bindings.bind(GestureSymbol::TwoFingers, GestureAction::Key(KeyName::Space));
        bindings.bind(GestureSymbol::ThreeFingers, GestureAction::Key(KeyName::Space));

        assert!(bindings
            .handle(&ev(GestureSymbol::TwoFingers, Transition::Appear))
            .is_some());
        assert_eq!(
            bindings.handle(&ev(GestureSymbol::ThreeFingers, Transition::Appear)),
            None
        );
        assert!(bindings
            .handle(&ev(GestureSymbol::TwoFingers, Transition::Disappear))
            .is_some());
        // La tecla ya se soltó
        assert_eq!(
            bindings.handle(&ev(GestureSymbol::ThreeFingers, Transition::Disappear)),
            None
        );
    }

    #[test]
    fn test_click_only_on_appear_and_unbound_ignored() {
        let mut bindings = ActionBindings::new();
        bindings.bind(GestureSymbol::FourFingers, GestureAction::Click(MouseButton::Left));

        assert_eq!(
            bindings.handle(&ev(GestureSymbol::FourFingers, Transition::Appear)),
            Some(HidCommand::Click(MouseButton::Left))
        );
        assert_eq!(
            bindings.handle(&ev(GestureSymbol::FourFingers, Transition::Disappear)),
            None
        );
        assert_eq!(bindings.handle(&ev(GestureSymbol::Fist, Transition::Appear)), None);
    }

    #[test]
    fn test_release_all() {
        let mut bindings = ActionBindings::arrows();
        bindings.handle(&ev(GestureSymbol::OpenPalm, Transition::Appear));
        bindings.handle(&ev(GestureSymbol::LeftSwipe, Transition::Appear));

        assert_eq!(
            bindings.release_all(),
            vec![HidCommand::Release(KeyName::Left), HidCommand::Release(KeyName::Up)]
        );
        assert!(bindings.release_all().is_empty());
    }
}
