pub mod builder;
pub mod metadata;
pub mod model;
pub mod network;
pub mod spec;

pub use builder::NetworkBuilder;
pub use metadata::{InputType, ModelMetadata};
pub use model::TrainedModel;
pub use network::Network;
pub use spec::{HiddenActivations, HiddenLayer, LayerSpec, ModelConfig, NetworkSpec};
