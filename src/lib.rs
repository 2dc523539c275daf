pub mod api;
pub mod browser;
pub mod cache;
pub mod error;
pub mod fontface;
pub mod resource;
pub mod types;
pub mod validator;
pub mod window;

pub use api::{HttpApi, SpecimenApi};
pub use browser::{BrowseState, CatalogueBrowser, FACE_LOAD_DELAY, SEARCH_DEBOUNCE};
pub use cache::{DiskFontCache, FontBinaryCache, MemoryFontCache};
pub use error::{ClientError, Result};
pub use fontface::{FontFaceLoader, FontRegistry};
pub use resource::{FolderStore, Patch, Resource, ResourceCache};
pub use types::{
    FolderEntry, FolderStatus, FontFamilySummary, FontStyleEntry, PathValidationStatus,
    ValidationOutcome,
};
pub use validator::{PathValidator, ValidatorFn, DEFAULT_DEBOUNCE};
pub use window::{compute_window, offset_of, RowLayout, Viewport, Window, FRAME_INTERVAL};
