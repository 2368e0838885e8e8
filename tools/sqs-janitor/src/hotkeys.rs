use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Quit,
    CursorUp,
    CursorDown,
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub label: &'static str,
    pub keys: &'static [KeyCode],
    pub action: HotkeyAction,
    pub description: &'static str,
}

pub const QUEUE_LIST_BINDINGS: [HotkeyBinding; 4] = [
    HotkeyBinding {
        label: "↑/k",
        keys: &[KeyCode::Up, KeyCode::Char('k')],
        action: HotkeyAction::CursorUp,
        description: "up",
    },
    HotkeyBinding {
        label: "↓/j",
        keys: &[KeyCode::Down, KeyCode::Char('j')],
        action: HotkeyAction::CursorDown,
        description: "down",
    },
    HotkeyBinding {
        label: "enter",
        keys: &[KeyCode::Enter],
        action: HotkeyAction::Purge,
        description: "purge",
    },
    HotkeyBinding {
        label: "q/esc/ctrl-c",
        keys: &[KeyCode::Char('q'), KeyCode::Esc],
        action: HotkeyAction::Quit,
        description: "quit",
    },
];

pub fn queue_list_controls_legend() -> String {
    let parts = QUEUE_LIST_BINDINGS
        .iter()
        .map(|binding| format!("{} {}", binding.label, binding.description))
        .collect::<Vec<_>>();
    format!("Keys: {}", parts.join("  "))
}

pub fn action_for_key(code: KeyCode, modifiers: KeyModifiers) -> Option<HotkeyAction> {
    // Ctrl-C quits from anywhere, before the table is consulted.
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Some(HotkeyAction::Quit),
            _ => None,
        };
    }
    QUEUE_LIST_BINDINGS
        .iter()
        .find(|binding| binding.keys.contains(&code))
        .map(|binding| binding.action)
}

pub fn action_for_key_event(event: &KeyEvent) -> Option<HotkeyAction> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    action_for_key(event.code, event.modifiers)
}
