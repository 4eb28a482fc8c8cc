//! Graphics provider
//!
//! Window setup and 2D drawing imports. Drawing is recorded as
//! [`DrawCommand`]s in [`GraphicsState`]; the host drains them after each
//! tick and rasterises them however it likes.
//!
//! Structs the module passes "by value" (`Color`, `Texture2D`, `Vector2`)
//! arrive as pointers into its memory, following the wasm32 C ABI.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use super::caller_memory;
use crate::env::{ENV, HostFunction, HostState, Provider};
use crate::memory;
use crate::registry::{AssetRoot, Handle, ResourceRegistry};

/// Width and height reported for every loaded texture
///
/// Image metadata is not tracked per handle yet, so modules always see a
/// 60x60 texture regardless of the actual asset.
pub const PLACEHOLDER_TEXTURE_SIZE: i32 = 60;

/// Opaque RGB color decoded from a packed integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Decode from low-to-high bytes red, green, blue; alpha is forced opaque
    pub fn from_packed(packed: u32) -> Self {
        Self {
            r: (packed & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: ((packed >> 16) & 0xFF) as u8,
            a: 0xFF,
        }
    }
}

/// Window requested by the module through `InitWindow`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub width: i32,
    pub height: i32,
    pub title: String,
}

/// Metadata written back to the module by `LoadTextureInternal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub handle: Handle,
    pub width: i32,
    pub height: i32,
    pub mipmaps: i32,
    pub format: i32,
}

/// One recorded drawing primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        color: Color,
    },
    Rectangle {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: Color,
    },
    Circle {
        center_x: i32,
        center_y: i32,
        radius: f32,
        color: Color,
    },
    Text {
        text: String,
        x: i32,
        y: i32,
        font_size: i32,
        color: Color,
    },
    Texture {
        handle: Handle,
        path: String,
        x: f32,
        y: f32,
        rotation: f32,
        scale: f32,
        tint: Color,
    },
}

/// Approximate text metrics for `MeasureText`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Horizontal advance of one glyph as a fraction of the font size
    pub advance_ratio: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self { advance_ratio: 0.6 }
    }
}

impl FontMetrics {
    pub fn measure(&self, text: &str, font_size: i32) -> i32 {
        let glyphs = text.chars().count() as f32;
        (glyphs * font_size as f32 * self.advance_ratio).round() as i32
    }
}

/// Host-side graphics state for one module instance
#[derive(Debug, Default)]
pub struct GraphicsState {
    window: Option<WindowInfo>,
    commands: Vec<DrawCommand>,
    textures: ResourceRegistry,
    assets: AssetRoot,
    metrics: FontMetrics,
    frames: u64,
}

impl GraphicsState {
    pub fn new(assets: AssetRoot, metrics: FontMetrics) -> Self {
        Self {
            assets,
            metrics,
            ..Self::default()
        }
    }

    pub fn window(&self) -> Option<&WindowInfo> {
        self.window.as_ref()
    }

    /// Commands recorded since the last drain
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drain the recorded commands for rendering
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of completed `BeginDrawing`/`EndDrawing` frames
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn textures(&self) -> &ResourceRegistry {
        &self.textures
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Intern a texture by file name and report its (placeholder) metadata
    pub fn load_texture(&mut self, file: &str) -> TextureInfo {
        let handle = self.textures.intern(&self.assets.resolve(file));
        TextureInfo {
            handle,
            width: PLACEHOLDER_TEXTURE_SIZE,
            height: PLACEHOLDER_TEXTURE_SIZE,
            mipmaps: 1,
            format: 0,
        }
    }
}

/// Store contexts that carry graphics state
pub trait GraphicsHost: HostState {
    fn graphics(&mut self) -> &mut GraphicsState;
}

/// Provides window and drawing imports
pub struct GraphicsProvider;

impl<T: GraphicsHost> Provider<T> for GraphicsProvider {
    fn name(&self) -> &str {
        "graphics"
    }

    fn functions(&self) -> Vec<HostFunction<T>> {
        vec![
            HostFunction::new("InitWindow", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, init_window::<T>).map(|_| ())
            }),
            HostFunction::new("BeginDrawing", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, begin_drawing::<T>).map(|_| ())
            }),
            HostFunction::new("EndDrawing", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, end_drawing::<T>).map(|_| ())
            }),
            HostFunction::new("ClearBackground", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, clear_background::<T>).map(|_| ())
            }),
            HostFunction::new("DrawRectangle", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, draw_rectangle::<T>).map(|_| ())
            }),
            HostFunction::new("DrawCircle", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, draw_circle::<T>).map(|_| ())
            }),
            HostFunction::new("DrawText", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, draw_text::<T>).map(|_| ())
            }),
            HostFunction::new("MeasureText", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, measure_text::<T>).map(|_| ())
            }),
            HostFunction::new("LoadTextureInternal", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, load_texture::<T>).map(|_| ())
            }),
            HostFunction::new("DrawTextureEx", |linker: &mut Linker<T>, name: &str| {
                linker.func_wrap(ENV, name, draw_texture::<T>).map(|_| ())
            }),
        ]
    }
}

fn read_color(data: &[u8], color_ptr: u32) -> Result<Color> {
    Ok(Color::from_packed(memory::read_u32(data, color_ptr)?))
}

fn init_window<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    width: i32,
    height: i32,
    title_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let title = memory::read_cstring(memory.data(&caller), title_ptr)?;
    tracing::debug!(module = caller.data().label(), width, height, %title, "InitWindow");
    caller.data_mut().graphics().window = Some(WindowInfo {
        width,
        height,
        title,
    });
    Ok(())
}

fn begin_drawing<T: GraphicsHost>(_caller: Caller<'_, T>) {}

fn end_drawing<T: GraphicsHost>(mut caller: Caller<'_, T>) {
    caller.data_mut().graphics().frames += 1;
}

fn clear_background<T: GraphicsHost>(mut caller: Caller<'_, T>, color_ptr: u32) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let color = read_color(memory.data(&caller), color_ptr)?;
    caller.data_mut().graphics().push(DrawCommand::Clear { color });
    Ok(())
}

fn draw_rectangle<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    color_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let color = read_color(memory.data(&caller), color_ptr)?;
    caller.data_mut().graphics().push(DrawCommand::Rectangle {
        x,
        y,
        width,
        height,
        color,
    });
    Ok(())
}

fn draw_circle<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    center_x: i32,
    center_y: i32,
    radius: f32,
    color_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let color = read_color(memory.data(&caller), color_ptr)?;
    caller.data_mut().graphics().push(DrawCommand::Circle {
        center_x,
        center_y,
        radius,
        color,
    });
    Ok(())
}

fn draw_text<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    text_ptr: u32,
    x: i32,
    y: i32,
    font_size: i32,
    color_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let data = memory.data(&caller);
    let text = memory::read_cstring(data, text_ptr)?;
    let color = read_color(data, color_ptr)?;
    caller.data_mut().graphics().push(DrawCommand::Text {
        text,
        x,
        y,
        font_size,
        color,
    });
    Ok(())
}

fn measure_text<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    text_ptr: u32,
    font_size: i32,
) -> Result<i32> {
    let memory = caller_memory(&mut caller)?;
    let text = memory::read_cstring(memory.data(&caller), text_ptr)?;
    Ok(caller.data_mut().graphics().metrics.measure(&text, font_size))
}

fn load_texture<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    file_ptr: u32,
    id_ptr: u32,
    width_ptr: u32,
    height_ptr: u32,
    mipmaps_ptr: u32,
    format_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    let file = memory::read_cstring(data, file_ptr)?;
    let info = ctx.graphics().load_texture(&file);

    memory::write_i32(data, id_ptr, info.handle as i32)?;
    memory::write_i32(data, width_ptr, info.width)?;
    memory::write_i32(data, height_ptr, info.height)?;
    memory::write_i32(data, mipmaps_ptr, info.mipmaps)?;
    memory::write_i32(data, format_ptr, info.format)?;
    Ok(())
}

fn draw_texture<T: GraphicsHost>(
    mut caller: Caller<'_, T>,
    texture_ptr: u32,
    position_ptr: u32,
    rotation: f32,
    scale: f32,
    tint_ptr: u32,
) -> Result<()> {
    let memory = caller_memory(&mut caller)?;
    let (data, ctx) = memory.data_and_store_mut(&mut caller);

    // Texture2D begins with its id field, which carries the registry handle
    let handle = memory::read_u32(data, texture_ptr)?;
    let x = memory::read_f32(data, position_ptr)?;
    let y = memory::read_f32(data, position_ptr.wrapping_add(4))?;
    let tint = read_color(data, tint_ptr)?;

    let graphics = ctx.graphics();
    let path = graphics.textures.resolve(handle)?.to_string();
    graphics.push(DrawCommand::Texture {
        handle,
        path,
        x,
        y,
        rotation,
        scale,
        tint,
    });
    Ok(())
}
