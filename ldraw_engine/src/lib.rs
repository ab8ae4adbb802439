pub mod camera;
pub mod config;
pub mod geometry;
pub mod input;
pub mod model_container;
pub mod navigator;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod step_container;
pub mod step_manager;

pub use camera::{
    CameraLens, CameraPose, CameraState, CameraTag, FrameOutcome, FrameRequest, StepCamera,
    TransitionId,
};
pub use config::{load_viewer_config, ViewerConfig};
pub use geometry::{CatalogGeometry, GeometryProvider, MaterialHandle, MeshHandle};
pub use input::{GestureDelta, GestureTracker, InputAdapter};
pub use navigator::FlatStepNavigator;
pub use runtime::{BuildScene, GeometryPolicy, RuntimeModel, StepSnapshot};
pub use scene::{NodeId, RenderLayer, SceneGraph};
pub use session::{BuildSession, PartListEntry, StepPhase};
pub use step_manager::{tally_step_parts, PartTally};
