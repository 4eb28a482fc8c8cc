//! Formatting and logging provider
//!
//! The minimal surface every module gets, players included.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use super::caller_memory;
use crate::env::{ENV, HostFunction, HostState, Provider};
use crate::memory;

/// Provides `ConsoleLog`, `StringFormat` and `memset`
pub struct FormatProvider;

impl<T: HostState> Provider<T> for FormatProvider {
    fn name(&self) -> &str {
        "format"
    }

    fn functions(&self) -> Vec<HostFunction<T>> {
        vec![
            HostFunction::new("ConsoleLog", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, console_log::<T>).map(|_| ())
            }),
            HostFunction::new("StringFormat", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, string_format::<T>).map(|_| ())
            }),
            HostFunction::new("memset", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, memset::<T>).map(|_| ())
            }),
        ]
    }
}

fn console_log<T: HostState>(
    mut caller: Caller<'_, T>,
    template_ptr: u32,
    args_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let data = memory.data(&caller);
    let template = memory::read_cstring(data, template_ptr)?;
    let line = memory::format_template(data, &template, args_ptr)?;
    tracing::info!(module = caller.data().label(), "{}", line);
    Ok(())
}

/// `snprintf`-style: returns the formatted byte length, and writes a
/// terminated copy when `dest_ptr` is non-zero
fn string_format<T: HostState>(
    mut caller: Caller<'_, T>,
    dest_ptr: u32,
    template_ptr: u32,
    args_ptr: u32,
) -> Result<i32> {
    let memory = caller_memory(&mut caller)?;
    let data = memory.data_mut(&mut caller);
    let template = memory::read_cstring(data, template_ptr)?;
    let formatted = memory::format_template(data, &template, args_ptr)?;
    if dest_ptr != 0 {
        memory::write_cstring(data, dest_ptr, &formatted)?;
    }
    Ok(formatted.len() as i32)
}

/// C `memset`: fills `len` bytes and returns the destination
fn memset<T: HostState>(
    mut caller: Caller<'_, T>,
    dest_ptr: u32,
    value: i32,
    len: u32,
) -> Result<u32> {
    tracing::trace!(module = caller.data().label(), dest_ptr, value, len, "memset");
    let memory = caller_memory(&mut caller)?;
    memory::fill(memory.data_mut(&mut caller), dest_ptr, value as u8, len as usize)?;
    Ok(dest_ptr)
}
