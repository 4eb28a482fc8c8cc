//! Input provider
//!
//! Pointer position and edge-triggered button queries. The host feeds
//! platform events into [`InputState`]; a query that observes a set edge
//! clears it. The coordinator owns the only live state and lends it to a
//! player during a relay, so each physical press is reported at most once
//! across all modules.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use super::caller_memory;
use crate::env::{ENV, HostFunction, HostState, Provider};
use crate::memory;

/// Cursor coordinate reported before any pointer event has been observed
pub const NO_POINTER: i32 = -1;

/// Host-side pointer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    x: i32,
    y: i32,
    pressed: bool,
    released: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            x: NO_POINTER,
            y: NO_POINTER,
            pressed: false,
            released: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn pointer_moved(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn pointer_pressed(&mut self, x: i32, y: i32) {
        self.pointer_moved(x, y);
        self.pressed = true;
    }

    pub fn pointer_released(&mut self, x: i32, y: i32) {
        self.pointer_moved(x, y);
        self.released = true;
    }

    /// Consume the pressed edge
    ///
    /// Any pending press satisfies any button id: button identity is not
    /// tracked, and modules rely on that behavior.
    pub fn take_pressed(&mut self, _button: i32) -> bool {
        std::mem::take(&mut self.pressed)
    }

    /// Consume the released edge; button identity is ignored as for presses
    pub fn take_released(&mut self, _button: i32) -> bool {
        std::mem::take(&mut self.released)
    }
}

/// Store contexts that carry input state
pub trait InputHost: HostState {
    fn input(&mut self) -> &mut InputState;
}

/// Provides pointer imports
pub struct InputProvider;

impl<T: InputHost> Provider<T> for InputProvider {
    fn name(&self) -> &str {
        "input"
    }

    fn functions(&self) -> Vec<HostFunction<T>> {
        vec![
            HostFunction::new(
                "GetMousePositionInternal",
                |linker: &mut Linker<T>, name: &str| {
                    linker.func_wrap(ENV, name, mouse_position::<T>).map(|_| ())
                },
            ),
            HostFunction::new("IsMouseButtonPressed", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, is_button_pressed::<T>).map(|_| ())
            }),
            HostFunction::new("IsMouseButtonReleased", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, is_button_released::<T>).map(|_| ())
            }),
        ]
    }
}

fn mouse_position<T: InputHost>(mut caller: Caller<'_, T>, x_ptr: u32, y_ptr: u32) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    let (x, y) = ctx.input().cursor();
    memory::write_i32(data, x_ptr, x)?;
    memory::write_i32(data, y_ptr, y)?;
    Ok(())
}

fn is_button_pressed<T: InputHost>(mut caller: Caller<'_, T>, button: i32) -> i32 {
    caller.data_mut().input().take_pressed(button) as i32
}

fn is_button_released<T: InputHost>(mut caller: Caller<'_, T>, button: i32) -> i32 {
    caller.data_mut().input().take_released(button) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_sentinel() {
        assert_eq!(InputState::new().cursor(), (NO_POINTER, NO_POINTER));
    }

    #[test]
    fn test_press_is_consumed_once() {
        let mut input = InputState::new();
        input.pointer_pressed(10, 20);
        assert_eq!(input.cursor(), (10, 20));
        assert!(input.take_pressed(0));
        assert!(!input.take_pressed(0));
    }

    #[test]
    fn test_any_button_id_matches_press() {
        let mut input = InputState::new();
        input.pointer_pressed(1, 1);
        assert!(input.take_pressed(2));
    }

    #[test]
    fn test_release_edge_independent_of_press() {
        let mut input = InputState::new();
        input.pointer_pressed(1, 1);
        input.pointer_released(3, 4);
        assert!(input.take_released(0));
        assert!(input.take_pressed(0));
        assert!(!input.take_released(0));
        assert_eq!(input.cursor(), (3, 4));
    }
}
