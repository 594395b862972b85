pub mod renderer;

pub use renderer::{NoteRenderer, RendererError, SceneLayout};
