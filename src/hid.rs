use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crossbeam_channel::Receiver;
use thiserror::Error;
use tracing::{debug, info, warn};
use uinput::device::Device;
use uinput::event::controller;
use uinput::event::keyboard;

/// Teclas que se pueden asociar a un gesto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Esc,
    Tab,
    PageUp,
    PageDown,
    Home,
    End,
}

impl KeyName {
    pub const ALL: [KeyName; 12] = [
        KeyName::Up,
        KeyName::Down,
        KeyName::Left,
        KeyName::Right,
        KeyName::Space,
        KeyName::Enter,
        KeyName::Esc,
        KeyName::Tab,
        KeyName::PageUp,
        KeyName::PageDown,
        KeyName::Home,
        KeyName::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Space => "space",
            Self::Enter => "enter",
            Self::Esc => "esc",
            Self::Tab => "tab",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::Home => "home",
            Self::End => "end",
        }
    }

    fn uinput_key(self) -> keyboard::Key {
        match self {
            Self::Up => keyboard::Key::Up,
            Self::Down => keyboard::Key::Down,
            Self::Left => keyboard::Key::Left,
            Self::Right => keyboard::Key::Right,
            Self::Space => keyboard::Key::Space,
            Self::Enter => keyboard::Key::Enter,
            Self::Esc => keyboard::Key::Esc,
            Self::Tab => keyboard::Key::Tab,
            Self::PageUp => keyboard::Key::PageUp,
            Self::PageDown => keyboard::Key::PageDown,
            Self::Home => keyboard::Key::Home,
            Self::End => keyboard::Key::End,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }

    fn uinput_button(self) -> controller::Mouse {
        match self {
            Self::Left => controller::Mouse::Left,
            Self::Right => controller::Mouse::Right,
            Self::Middle => controller::Mouse::Middle,
        }
    }
}

/// Acción asociada a un gesto: mantener una tecla o hacer un click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    Key(KeyName),
    Click(MouseButton),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Acción desconocida: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for GestureAction {
    type Err = UnknownAction;

    /// "down", "pageup", ... o "click:left|right|middle"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(button) = name.strip_prefix("click:") {
            return match button {
                "left" => Ok(Self::Click(MouseButton::Left)),
                "right" => Ok(Self::Click(MouseButton::Right)),
                "middle" => Ok(Self::Click(MouseButton::Middle)),
                _ => Err(UnknownAction(s.to_string())),
            };
        }
        KeyName::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .map(Self::Key)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for GestureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key.as_str()),
            Self::Click(button) => write!(f, "click:{}", button.as_str()),
        }
    }
}

/// Orden que viaja del bucle de frames al hilo HID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidCommand {
    Press(KeyName),
    Release(KeyName),
    Click(MouseButton),
}

#[derive(Error, Debug)]
pub enum HidError {
    #[error("uinput: {0}")]
    Uinput(#[from] uinput::Error),
}

/// Destino de las acciones de teclado y mouse
pub trait ActionSink {
    fn press_key(&mut self, key: KeyName) -> Result<(), HidError>;
    fn release_key(&mut self, key: KeyName) -> Result<(), HidError>;
    fn click(&mut self, button: MouseButton) -> Result<(), HidError>;

    fn apply(&mut self, command: HidCommand) -> Result<(), HidError> {
        match command {
            HidCommand::Press(key) => self.press_key(key),
            HidCommand::Release(key) => self.release_key(key),
            HidCommand::Click(button) => self.click(button),
        }
    }
}

/// Teclado y mouse virtuales sobre /dev/uinput
pub struct HidOutput {
    dev: Device,
}

impl HidOutput {
    pub fn new() -> Result<Self, HidError> {
        let dev = uinput::default()?
            .name("manos-hid")?
            .event(uinput::event::Keyboard::All)?
            .event(uinput::event::Controller::Mouse(controller::Mouse::Left))?
            .event(uinput::event::Controller::Mouse(controller::Mouse::Right))?
            .event(uinput::event::Controller::Mouse(controller::Mouse::Middle))?
            .create()?;

        Ok(HidOutput { dev })
    }

    fn sync(&mut self) -> Result<(), HidError> {
        self.dev.synchronize()?;
        Ok(())
    }
}

impl ActionSink for HidOutput {
    fn press_key(&mut self, key: KeyName) -> Result<(), HidError> {
        self.dev.press(&keyboard::Keyboard::Key(key.uinput_key()))?;
        self.sync()
    }

    fn release_key(&mut self, key: KeyName) -> Result<(), HidError> {
        self.dev.release(&keyboard::Keyboard::Key(key.uinput_key()))?;
        self.sync()
    }

    /// Click simple (press + release)
    fn click(&mut self, button: MouseButton) -> Result<(), HidError> {
        let button = controller::Controller::Mouse(button.uinput_button());
        self.dev.press(&button)?;
        self.sync()?;
        std::thread::sleep(Duration::from_millis(10));
        self.dev.release(&button)?;
        self.sync()
    }
}

/// Modo --dry-run: sólo registra lo que se habría enviado
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ActionSink for LoggingSink {
    fn press_key(&mut self, key: KeyName) -> Result<(), HidError> {
        info!(key = key.as_str(), "🎮 press");
        Ok(())
    }

    fn release_key(&mut self, key: KeyName) -> Result<(), HidError> {
        info!(key = key.as_str(), "🎮 release");
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<(), HidError> {
        info!(button = button.as_str(), "🖱️ click");
        Ok(())
    }
}

/// Bucle del hilo HID: aplica órdenes hasta que se cierra el canal.
/// Devuelve cuántas se aplicaron sin error.
pub fn run_hid_worker<S: ActionSink + ?Sized>(sink: &mut S, rx: Receiver<HidCommand>) -> u64 {
    let mut applied = 0u64;
    while let Ok(command) = rx.recv() {
        debug!(?command, "orden HID");
        match sink.apply(command) {
            Ok(()) => applied += 1,
            Err(e) => warn!(?command, "error enviando acción HID: {}", e),
        }
    }
    debug!(applied, "canal HID cerrado");
    applied
}
