//! Reelforge Script Model
//!
//! Defines the data contracts shared by the segmenter and the assembly
//! pipeline:
//! - **Scene:** externally authored unit of content with a `M:SS-M:SS` range
//! - **SubClip:** a generation-sized slice of a scene
//! - **MediaArtifact:** a video or audio file produced along the way
//! - **ContentScript:** the scene list as loaded from a script JSON file
//!
//! Only the timing fields are structurally required; every other scene
//! attribute is carried through untouched.

pub mod artifact;
pub mod clip;
pub mod scene;
pub mod script;

pub use artifact::*;
pub use clip::*;
pub use scene::*;
pub use script::*;
