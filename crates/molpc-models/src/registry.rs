//! Models selectable by name from a configuration file.

use crate::model::MolGraphModel;
use burn::tensor::backend::Backend;
use molpc_core::error::{MolGraphError, Result};
use molpc_core::{HyperParams, MixtureVariant};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Fixed-size mixture, `molspn_zero_sort`
    MolSpnZeroSort,
    /// Size-prior mixture with marginalized padding, `marg_sort`
    MargSort,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::MolSpnZeroSort, ModelKind::MargSort];

    pub const fn name(&self) -> &'static str {
        match self {
            ModelKind::MolSpnZeroSort => "molspn_zero_sort",
            ModelKind::MargSort => "marg_sort",
        }
    }

    pub const fn variant(&self) -> MixtureVariant {
        match self {
            ModelKind::MolSpnZeroSort => MixtureVariant::Plain,
            ModelKind::MargSort => MixtureVariant::SizePrior,
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                MolGraphError::InvalidConfig(format!(
                    "unknown model '{name}', expected one of {:?}",
                    Self::ALL.map(|k| k.name())
                ))
            })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = MolGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Build the factorized model named by `params.name`.
///
/// The configured variant must agree with the named model.
pub fn build_model<B: Backend>(params: &HyperParams, device: &B::Device) -> Result<MolGraphModel<B>> {
    let kind = ModelKind::from_name(&params.name)?;
    if kind.variant() != params.model.variant {
        return Err(MolGraphError::InvalidConfig(format!(
            "model '{kind}' is a {:?} mixture but the config asks for {:?}",
            kind.variant(),
            params.model.variant
        )));
    }
    MolGraphModel::factorized(params.model.clone(), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(
            ModelKind::from_name("marg_sort").unwrap().variant(),
            MixtureVariant::SizePrior
        );
        assert_eq!(
            "molspn_zero_sort".parse::<ModelKind>().unwrap(),
            ModelKind::MolSpnZeroSort
        );
        assert!(matches!(
            ModelKind::from_name("graphspn"),
            Err(MolGraphError::InvalidConfig(_))
        ));
    }
}
