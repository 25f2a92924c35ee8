use super::*;

pub const NB_CLUSTERS: i64 = 10;
/// Variables of the backbone live under this path
pub const BACKBONE_PATH: &str = "backbone";

/// Whether layers like batch norm should behave as in training or in inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        self == Mode::Train
    }
}

/// Input is [batch, 1, 28, 28], output is a [batch, NB_CLUSTERS] soft cluster assignment
pub fn backbone_net(vs: &nn::Path) -> nn::SequentialT {
    let conv_cfg = nn::ConvConfig {
        padding: 1,
        ..Default::default()
    };

    nn::seq_t()
        .add(nn::conv2d(vs / "conv1", 1, 32, 3, conv_cfg))
        .add(nn::batch_norm2d(vs / "bn1", 32, Default::default()))
        .add_fn(|x| x.relu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add(nn::conv2d(vs / "conv2", 32, 64, 3, conv_cfg))
        .add(nn::batch_norm2d(vs / "bn2", 64, Default::default()))
        .add_fn(|x| x.relu())
        .add_fn(|x| x.max_pool2d_default(2))
        .add(nn::conv2d(vs / "conv3", 64, 128, 3, conv_cfg))
        .add(nn::batch_norm2d(vs / "bn3", 128, Default::default()))
        .add_fn(|x| x.relu())
        // 28 -> 14 -> 7 -> 3
        .add_fn(|x| x.max_pool2d_default(2))
        .add_fn(|x| x.flat_view())
        .add(nn::linear(vs / "fc", 128 * 3 * 3, NB_CLUSTERS, Default::default()))
        .add_fn(|x| x.softmax(-1, Kind::Float))
}

/// Two branch model, both branches share the backbone weights
pub struct IicModel {
    pub backbone: nn::SequentialT,
}

impl IicModel {
    pub fn new(vs: &nn::Path) -> IicModel {
        IicModel {
            backbone: backbone_net(&(vs / BACKBONE_PATH)),
        }
    }

    /// (z, zt): cluster assignments of the original and of the transformed images
    pub fn forward(&self, x: &Tensor, xt: &Tensor, mode: Mode) -> (Tensor, Tensor) {
        let z = self.backbone.forward_t(x, mode.is_train());
        let zt = self.backbone.forward_t(xt, mode.is_train());
        (z, zt)
    }
}
