use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::bindings::ActionBindings;
use crate::gesture_engine::GestureEngine;
use crate::hid::HidCommand;
use crate::types::{GestureEvent, GestureSymbol, Transition};

/// Texto de la etiqueta en pantalla para un evento
pub fn label_text(event: &GestureEvent) -> String {
    match event.transition {
        Transition::Appear => format!("✋ {}", event.symbol.display_label()),
        Transition::Disappear => format!("   {} ✗", event.symbol.display_label()),
    }
}

/// Registra un callback por gesto: etiqueta en el log y acción HID si hay
/// binding. Los gestos sin binding sólo se registran si hay etiquetas.
/// Devuelve los gestos registrados.
pub fn install_callbacks(
    engine: &mut GestureEngine,
    bindings: Rc<RefCell<ActionBindings>>,
    hid_tx: Sender<HidCommand>,
    labels: bool,
) -> Vec<GestureSymbol> {
    let mut installed = Vec::new();

    for symbol in GestureSymbol::ALL {
        let bound = bindings.borrow().action(symbol).is_some();
        if !bound && !labels {
            continue;
        }

        let bindings = Rc::clone(&bindings);
        let hid_tx = hid_tx.clone();
        engine.register(symbol, move |ev| {
            if labels {
                info!("{}", label_text(ev));
            }
            if let Some(command) = bindings.borrow_mut().handle(ev) {
                if hid_tx.send(command).is_err() {
                    warn!(?command, "hilo HID no disponible");
                }
            }
        });
        installed.push(symbol);
    }

    installed
}
