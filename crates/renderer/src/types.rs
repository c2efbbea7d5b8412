use std::path::PathBuf;

/// Immutable configuration passed to the renderer at start-up.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Window size in physical pixels when not fullscreen.
    pub surface_size: (u32, u32),
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    pub title: String,
    /// One fragment shader per region, left to right.
    pub shader_paths: Vec<PathBuf>,
    /// Close the window once Escape has been pressed more than this many times.
    pub escape_presses: Option<u32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            fullscreen: false,
            title: "Sinestesia".to_string(),
            shader_paths: Vec::new(),
            escape_presses: None,
        }
    }
}
