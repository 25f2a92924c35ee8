use super::*;

/// Negative mutual information between the cluster assignments of the two branches.
///
/// `z` and `zt` are [batch, clusters] probabilities. The joint distribution is
/// estimated over the batch, made symmetric and normalised.
pub fn iic_loss(z: &Tensor, zt: &Tensor) -> Tensor {
    let joint = (z.unsqueeze(2) * zt.unsqueeze(1)).sum_dim_intlist(
        Some([0i64].as_slice()),
        false,
        Kind::Float,
    );
    let joint = (&joint + joint.transpose(0, 1)) / 2.;
    let joint = &joint / joint.sum(Kind::Float);
    // keep the logs finite
    let joint = joint.clamp_min(f64::EPSILON);
    let p_i = joint.sum_dim_intlist(Some([1i64].as_slice()), true, Kind::Float);
    let p_j = joint.sum_dim_intlist(Some([0i64].as_slice()), true, Kind::Float);
    (&joint * (p_i.log() + p_j.log() - joint.log())).sum(Kind::Float)
}
