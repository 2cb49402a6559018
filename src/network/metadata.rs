use serde::{Deserialize, Serialize};

use crate::dataset::assembler::DatasetConfig;
use crate::error::{Error, Result};
use crate::features::image::Interpolation;

/// How the input vector of a saved model was produced, so that inference
/// can rebuild it the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputType {
    /// Raw numeric features.
    Numeric,
    /// Image rescaled to `rows × cols` with `interpolation`, flattened as
    /// R,G,B[,A] per pixel and normalized to [0, 1].
    Image {
        rows: usize,
        cols: usize,
        include_alpha: bool,
        #[serde(default)]
        interpolation: Interpolation,
    },
}

impl InputType {
    pub fn for_dataset(config: &DatasetConfig) -> InputType {
        InputType::Image {
            rows: config.target_rows,
            cols: config.target_cols,
            include_alpha: config.include_alpha_channel,
            interpolation: config.interpolation,
        }
    }
}

/// Optional annotations stored next to the weights.
/// All fields are Option<> so minimal model files still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    pub input_type: Option<InputType>,
    /// Class names for the output columns, in one-hot order.
    pub output_labels: Option<Vec<String>>,
}

impl ModelMetadata {
    /// Fails when the model was trained on images prepared differently
    /// from `config`.  A model without a recorded input type is accepted.
    pub fn check_dataset(&self, config: &DatasetConfig) -> Result<()> {
        match &self.input_type {
            None => Ok(()),
            Some(recorded) if *recorded == InputType::for_dataset(config) => Ok(()),
            Some(recorded) => Err(Error::InvalidModelConfiguration(format!(
                "model was trained on {recorded:?} but the dataset is configured as {:?}",
                InputType::for_dataset(config)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained_on(rows: usize, cols: usize) -> ModelMetadata {
        let config = DatasetConfig::new(rows, cols, 3, true).unwrap();
        ModelMetadata { input_type: Some(InputType::for_dataset(&config)), ..Default::default() }
    }

    #[test]
    fn transposed_dimensions_are_rejected() {
        let meta = trained_on(2, 8);
        assert!(meta.check_dataset(&DatasetConfig::new(2, 8, 3, true).unwrap()).is_ok());
        assert!(matches!(
            meta.check_dataset(&DatasetConfig::new(8, 2, 3, true).unwrap()),
            Err(Error::InvalidModelConfiguration(_))
        ));
    }

    #[test]
    fn interpolation_and_alpha_must_match() {
        let meta = trained_on(4, 4);
        let nearest = DatasetConfig::new(4, 4, 3, true).unwrap().with_interpolation(Interpolation::Nearest);
        assert!(meta.check_dataset(&nearest).is_err());
        assert!(meta.check_dataset(&DatasetConfig::new(4, 4, 3, false).unwrap()).is_err());
    }

    #[test]
    fn unrecorded_input_type_is_accepted() {
        let config = DatasetConfig::new(4, 4, 3, true).unwrap();
        assert!(ModelMetadata::default().check_dataset(&config).is_ok());
    }

    #[test]
    fn older_files_default_the_interpolation() {
        let json = r#"{"type": "Image", "rows": 2, "cols": 2, "include_alpha": true}"#;
        let input: InputType = serde_json::from_str(json).unwrap();
        assert!(matches!(input, InputType::Image { interpolation: Interpolation::Triangle, .. }));
    }
}
