use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown state: {name}")]
    UnknownState { name: String },

    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    #[error("no rig bound to the component")]
    NoRig,

    #[error("bone matrix buffer too small: need {required} matrices, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    #[error("invalid layer index: {index}")]
    InvalidLayerIndex { index: usize },

    #[error("bone {bone} is stored before its parent {parent}")]
    InvalidHierarchy { bone: usize, parent: usize },

    #[error("clip '{clip}' references bone {bone} outside the skeleton")]
    InvalidBoneIndex { clip: String, bone: usize },

    #[error("clip '{clip}' has decreasing key times for bone {bone}")]
    UnsortedFrames { clip: String, bone: usize },
}
