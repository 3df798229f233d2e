mod conv;
mod dense;
mod dropout;
mod flatten;
mod layer;
mod pool;
mod relu;

pub use conv::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::Layer;
pub use pool::MaxPool2d;
pub use relu::Relu;
