mod classifier;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use classifier::{DigitClassifier, NUM_CLASSES, SAMPLE_SHAPE};
pub use model::Model;
pub use sequential::Sequential;
