//! Parameter blocks written to disk and read back through the loader

use lifcore_params::{
    ConfigError, LifSpec, ParamBlock, ParamBlockBuilder, Q15_16, ReceptorSpec,
};
use proptest::prelude::*;

fn two_type_block() -> ParamBlock {
    ParamBlockBuilder::new(64, 1.0)
        .receptor(ReceptorSpec::excitatory(5.0))
        .receptor(ReceptorSpec::inhibitory(10.0))
        .neuron_type(LifSpec::default())
        .neuron_type(LifSpec {
            tau_m_ms: Some(10.0),
            tau_refrac_ms: 2.0,
            ..LifSpec::default()
        })
        .assign_type(32..64, 1)
        .bias_all(0.25)
        .record(1)
        .record(63)
        .record_spikes(true)
        .build()
        .unwrap()
}

#[test]
fn block_survives_disk() {
    let block = two_type_block();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("population.lifc");
    std::fs::write(&path, block.encode()).unwrap();

    let loaded = ParamBlock::from_file(&path).unwrap();
    assert_eq!(loaded, block);
    assert_eq!(loaded.params_for(40).refractory_ticks, 2);
    assert_eq!(loaded.bias[17], Q15_16::from_f64(0.25));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ParamBlock::from_file(dir.path().join("absent.lifc")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

proptest! {
    #[test]
    fn truncated_blocks_are_rejected(cut in 0usize..200) {
        let bytes = two_type_block().encode();
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(ParamBlock::parse(&bytes[..cut]).is_err());
    }

    #[test]
    fn single_byte_corruption_is_rejected(offset in 0usize..400, flip in 1u8..=255) {
        let mut bytes = two_type_block().encode();
        let offset = offset % bytes.len();
        bytes[offset] ^= flip;
        prop_assert!(ParamBlock::parse(&bytes).is_err());
    }
}
