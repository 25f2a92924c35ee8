use tch::nn::{ModuleT, OptimizerConfig};
use tch::{nn, Device, Kind, Tensor};

pub mod iic_loss;
pub mod network;
pub mod trainer;

pub use network::{IicModel, Mode};
