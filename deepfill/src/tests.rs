use burn::config::Config;

use crate::{
    config::{GeneratorConfig, TrainingConfig},
    error::DeepFillError,
};

#[test]
fn test_default_configuration_is_valid() {
    assert!(TrainingConfig::new().validate().is_ok());
}

#[test]
fn test_zero_cadence() {
    let config = TrainingConfig::new().with_n_critic(0);

    match config.validate() {
        Err(DeepFillError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("n_critic must be greater than 0"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_mask_does_not_fit() {
    let config = TrainingConfig::new()
        .with_mask_shape([160, 128])
        .with_margin([64, 0]);

    match config.validate() {
        Err(DeepFillError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("does not fit into image 256x256"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_shapes_must_be_multiples_of_16() {
    let config = TrainingConfig::new()
        .with_image_shape([250, 256, 3])
        .with_mask_shape([64, 64]);

    match config.validate() {
        Err(DeepFillError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("image height (250)"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_cuda_without_devices() {
    let config = TrainingConfig::new().with_cuda(true).with_gpu_ids(vec![]);
    assert!(matches!(
        config.validate(),
        Err(DeepFillError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_channel_mismatch() {
    let config = TrainingConfig::new().with_generator(GeneratorConfig::new().with_input_dim(4));

    match config.validate() {
        Err(DeepFillError::InvalidConfiguration { reason }) => {
            assert!(reason.contains("image channels (3)"));
        }
        _ => panic!("Expected InvalidConfiguration error"),
    }
}

#[test]
fn test_json_roundtrip_keeps_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.json");
    TrainingConfig::new()
        .with_niter(10)
        .with_dataset_name("celeba".to_string())
        .save(&path)
        .unwrap();

    let config = TrainingConfig::load(&path).unwrap();
    assert_eq!(config.niter, 10);
    assert_eq!(config.dataset_name, "celeba");
    assert_eq!(config.n_critic, 5);
}

#[test]
fn test_partial_json_uses_defaults() {
    let config: TrainingConfig =
        serde_json::from_str(r#"{"niter": 20, "gpu_ids": [0, 1]}"#).unwrap();

    assert_eq!(config.niter, 20);
    assert_eq!(config.gpu_ids, vec![0, 1]);
    assert_eq!(config.batch_size, 16);
    assert!(config.validate().is_ok());
}
