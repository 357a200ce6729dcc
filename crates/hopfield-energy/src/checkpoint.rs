//! Read-only checkpoint bundle for a trained Energy Transformer.
//!
//! A bundle is a JSON object of named arrays, each stored as
//! `{ "shape": [...], "data": [...] }` in row-major order:
//!
//! | Name | Shape |
//! |------|-------|
//! | `wq`, `wk` | `[H, D, Y]` |
//! | `xi` | `[M, D]` |
//! | `embed` | `[P, D]` |
//! | `unembed` | `[D, P]` |
//! | `pos_embed` | `[N, D]` |
//! | `cls_token`, `mask_token` | `[D]` |
//! | `norm_bias` (optional) | `[D]` |
//!
//! plus scalars `norm_gamma`, optional `beta`, `norm_eps` and `exclude_self`.
//! The embedding arrays belong to the image pipeline; they are shape-checked
//! here and exposed read-only but otherwise left alone.

use std::path::Path;

use ndarray::{Array1, Array2, Array3, ArrayD, Dimension, Ix1, Ix2, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::read_json;
use crate::error::{HopfieldError, HopfieldResult};
use crate::layernorm::{EnergyLayerNorm, DEFAULT_EPS};
use crate::transformer::EnergyTransformer;

/// One named array: a shape and its row-major data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayRecord {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ArrayRecord {
    pub fn from_array<D: Dimension>(array: &ndarray::Array<f32, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }

    fn to_dyn(&self, name: &str) -> HopfieldResult<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone()).map_err(|_| {
            HopfieldError::invalid_config(format!(
                "array `{name}` has shape {:?} but {} values",
                self.shape,
                self.data.len()
            ))
        })
    }

    fn to_array<D: Dimension>(&self, name: &str) -> HopfieldResult<ndarray::Array<f32, D>> {
        let ndim = D::NDIM.unwrap_or(self.shape.len());
        self.to_dyn(name)?.into_dimensionality::<D>().map_err(|_| {
            HopfieldError::invalid_config(format!(
                "array `{name}` must be {ndim}-dimensional, got shape {:?}",
                self.shape
            ))
        })
    }
}

fn default_gamma() -> f32 {
    1.0
}

fn default_eps() -> f32 {
    DEFAULT_EPS
}

/// Serialized weights of a trained Energy Transformer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointBundle {
    pub wq: ArrayRecord,
    pub wk: ArrayRecord,
    pub xi: ArrayRecord,
    pub embed: ArrayRecord,
    pub unembed: ArrayRecord,
    pub pos_embed: ArrayRecord,
    pub cls_token: ArrayRecord,
    pub mask_token: ArrayRecord,
    #[serde(default = "default_gamma")]
    pub norm_gamma: f32,
    #[serde(default)]
    pub norm_bias: Option<ArrayRecord>,
    #[serde(default = "default_eps")]
    pub norm_eps: f32,
    #[serde(default)]
    pub beta: Option<f32>,
    #[serde(default)]
    pub exclude_self: bool,
}

/// Dimensions read off a validated bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckpointDims {
    /// Attention heads `H`.
    pub num_heads: usize,
    /// Token width `D`.
    pub token_dim: usize,
    /// Head width `Y`.
    pub head_dim: usize,
    /// Hopfield memories `M`.
    pub num_memories: usize,
    /// Patch width `P`.
    pub patch_dim: usize,
    /// Positions `N`.
    pub num_positions: usize,
}

impl CheckpointBundle {
    /// Load and validate a bundle from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> HopfieldResult<Self> {
        let path = path.as_ref();
        let bundle: Self = read_json(path)?;
        let dims = bundle.validate()?;
        debug!(path = %path.display(), ?dims, "loaded checkpoint bundle");
        Ok(bundle)
    }

    /// Check every array shape against the others.
    pub fn validate(&self) -> HopfieldResult<CheckpointDims> {
        let wq: Array3<f32> = self.wq.to_array("wq")?;
        let (num_heads, token_dim, head_dim) = wq.dim();
        expect_shape(&self.wk, &self.wq.shape)?;

        let xi: Array2<f32> = self.xi.to_array("xi")?;
        expect_dim(xi.ncols(), token_dim)?;

        let embed: Array2<f32> = self.embed.to_array("embed")?;
        let patch_dim = embed.nrows();
        expect_shape(&self.embed, &[patch_dim, token_dim])?;
        self.unembed.to_array::<Ix2>("unembed")?;
        expect_shape(&self.unembed, &[token_dim, patch_dim])?;

        let pos: Array2<f32> = self.pos_embed.to_array("pos_embed")?;
        expect_dim(pos.ncols(), token_dim)?;

        expect_vector(&self.cls_token, "cls_token", token_dim)?;
        expect_vector(&self.mask_token, "mask_token", token_dim)?;
        if let Some(bias) = &self.norm_bias {
            expect_vector(bias, "norm_bias", token_dim)?;
        }

        Ok(CheckpointDims {
            num_heads,
            token_dim,
            head_dim,
            num_memories: xi.nrows(),
            patch_dim,
            num_positions: pos.nrows(),
        })
    }

    /// Build the energy model described by the bundle.
    pub fn to_transformer(&self) -> HopfieldResult<EnergyTransformer> {
        self.validate()?;
        let bias = self
            .norm_bias
            .as_ref()
            .map(|b| b.to_array::<Ix1>("norm_bias"))
            .transpose()?;
        let norm = EnergyLayerNorm::new(self.norm_gamma, bias, self.norm_eps)?;
        EnergyTransformer::from_weights(
            self.wq.to_array("wq")?,
            self.wk.to_array("wk")?,
            self.xi.to_array("xi")?,
            self.beta,
            self.exclude_self,
            norm,
        )
    }

    pub fn embed(&self) -> HopfieldResult<Array2<f32>> {
        self.embed.to_array("embed")
    }

    pub fn unembed(&self) -> HopfieldResult<Array2<f32>> {
        self.unembed.to_array("unembed")
    }

    pub fn pos_embed(&self) -> HopfieldResult<Array2<f32>> {
        self.pos_embed.to_array("pos_embed")
    }

    pub fn cls_token(&self) -> HopfieldResult<Array1<f32>> {
        self.cls_token.to_array("cls_token")
    }

    pub fn mask_token(&self) -> HopfieldResult<Array1<f32>> {
        self.mask_token.to_array("mask_token")
    }
}

fn expect_dim(actual: usize, expected: usize) -> HopfieldResult<()> {
    if actual != expected {
        return Err(HopfieldError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn expect_shape(record: &ArrayRecord, expected: &[usize]) -> HopfieldResult<()> {
    if record.shape != expected {
        return Err(HopfieldError::shape_mismatch(expected, &record.shape));
    }
    Ok(())
}

fn expect_vector(record: &ArrayRecord, name: &str, len: usize) -> HopfieldResult<()> {
    record.to_array::<Ix1>(name)?;
    expect_shape(record, &[len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::TokenEnergy;
    use ndarray::Array;
    use std::io::Write;

    fn record(shape: &[usize]) -> ArrayRecord {
        let n: usize = shape.iter().product();
        ArrayRecord {
            shape: shape.to_vec(),
            data: (0..n).map(|i| ((i % 7) as f32 - 3.0) * 0.05).collect(),
        }
    }

    fn bundle() -> CheckpointBundle {
        let (h, d, y, m, p, n) = (2, 6, 3, 5, 12, 4);
        CheckpointBundle {
            wq: record(&[h, d, y]),
            wk: record(&[h, d, y]),
            xi: record(&[m, d]),
            embed: record(&[p, d]),
            unembed: record(&[d, p]),
            pos_embed: record(&[n, d]),
            cls_token: record(&[d]),
            mask_token: record(&[d]),
            norm_gamma: 1.0,
            norm_bias: Some(record(&[d])),
            norm_eps: DEFAULT_EPS,
            beta: None,
            exclude_self: false,
        }
    }

    #[test]
    fn test_validate_reports_dims() {
        let dims = bundle().validate().unwrap();
        assert_eq!(
            dims,
            CheckpointDims {
                num_heads: 2,
                token_dim: 6,
                head_dim: 3,
                num_memories: 5,
                patch_dim: 12,
                num_positions: 4,
            }
        );
    }

    #[test]
    fn test_to_transformer() {
        let et = bundle().to_transformer().unwrap();
        assert_eq!(et.token_dim(), 6);
        assert_eq!(et.attention().head_dim(), 3);
        assert!((et.attention().beta() - 1.0 / 3.0f32.sqrt()).abs() < 1e-6);
        assert_eq!(et.norm().dim(), Some(6));
    }

    #[test]
    fn test_mismatched_shapes_rejected() {
        let mut b = bundle();
        b.wk = record(&[2, 6, 4]);
        let err = b.validate().unwrap_err();
        assert!(matches!(err, HopfieldError::ShapeMismatch { .. }));

        let mut b = bundle();
        b.xi = record(&[5, 7]);
        assert!(matches!(
            b.validate().unwrap_err(),
            HopfieldError::DimensionMismatch {
                expected: 6,
                actual: 7
            }
        ));

        let mut b = bundle();
        b.unembed = record(&[12, 6]);
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_record_data_length_checked() {
        let mut b = bundle();
        b.xi.data.pop();
        let err = b.validate().unwrap_err();
        assert!(matches!(err, HopfieldError::InvalidConfig(_)));
    }

    #[test]
    fn test_record_round_trips_array() {
        let a = Array::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let r = ArrayRecord::from_array(&a);
        assert_eq!(r.to_array::<Ix2>("a").unwrap(), a);
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&bundle()).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let loaded = CheckpointBundle::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.mask_token().unwrap().len(), 6);
        assert_eq!(loaded.pos_embed().unwrap().dim(), (4, 6));
    }
}
