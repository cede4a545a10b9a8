//! Control-thread behavior: presets, host parameters, status and engine
//! retirement.

use hexfx::prelude::*;
use hexfx::{EngineFactory, PresetError};
use proptest::prelude::*;

mod helpers;
use helpers::*;

const BANK: &str = r#"{
    "presets": [
        {
            "id": "duo",
            "name": "Duo",
            "category": "Utility",
            "slots": [
                { "slot": 0, "type": 54, "mix": 1.0, "parameters": [0.75] },
                { "slot": 3, "type": 29, "mix": 0.5, "active": false }
            ]
        },
        {
            "id": "sloppy",
            "name": "Sloppy",
            "engines": [
                { "slot": 1, "type": 99, "mix": 2.0 },
                { "slot": 2, "type": 2, "params": [1.5, -1.0, 0.5] }
            ]
        },
        {
            "id": "broken",
            "name": "Broken",
            "slots": [
                { "slot": 0, "type": 29 },
                { "slot": 0, "type": 54 }
            ]
        }
    ]
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn settle(core: &mut ProcessorCore) {
    let mut block = vec![0.0f32; TEST_BUFFER_SIZE * 2];
    core.process_interleaved(&mut block, 2);
}

#[test]
fn test_preset_round_trip_through_handle() {
    let (mut core, handle) = test_processor();
    handle.load_preset_json(BANK, "duo").unwrap();
    settle(&mut core);

    let ids = core.engine_ids();
    assert_eq!(ids[0], EngineId(54));
    assert_eq!(ids[3], EngineId(29));
    assert!(handle.slot(3).unwrap().is_bypassed());
    assert_eq!(handle.slot(3).unwrap().mix(), 0.5);
    assert_eq!(handle.slot_params(0).unwrap().get(0), 0.75);

    let captured = handle.current_preset("duo", "Duo");
    assert_eq!(captured.slots.len(), 2);
    assert_eq!(captured.slot(0).unwrap().parameters[0], 0.75);
    assert!(!captured.slot(3).unwrap().active);
}

#[test]
fn test_lenient_load_repairs_values() {
    init_tracing();
    let (mut core, handle) = test_processor();
    handle.load_preset_json(BANK, "sloppy").unwrap();
    settle(&mut core);

    let ids = core.engine_ids();
    assert!(ids[1].is_bypass());
    assert_eq!(handle.slot(1).unwrap().mix(), 1.0);
    assert_eq!(ids[2], EngineId(2));

    let params = handle.slot_params(2).unwrap();
    assert_eq!(params.get(0), 1.0);
    assert_eq!(params.get(1), 0.0);
    assert_eq!(params.get(2), 0.5);
}

#[test]
fn test_strict_validation_reports_problems() {
    let bank = PresetBank::from_json(BANK).unwrap();
    assert!(bank.get("duo").unwrap().validate().is_ok());
    assert!(matches!(
        bank.get("sloppy").unwrap().validate(),
        Err(PresetError::EngineOutOfRange { engine: 99, .. })
    ));
    assert!(matches!(
        bank.get("broken").unwrap().validate(),
        Err(PresetError::DuplicateSlot { slot: 0, .. })
    ));
}

#[test]
fn test_rejected_preset_leaves_chain_untouched() {
    init_tracing();
    let (mut core, handle) = test_processor();
    handle.load_preset_json(BANK, "duo").unwrap();
    settle(&mut core);
    let before = core.engine_ids();

    let err = handle.load_preset_json(BANK, "broken").unwrap_err();
    assert!(matches!(err, Error::Preset(PresetError::DuplicateSlot { .. })));

    let err = handle.load_preset_json(BANK, "missing").unwrap_err();
    assert!(matches!(err, Error::Preset(PresetError::NotFound(_))));

    let err = handle.load_preset_json("{ not json", "duo").unwrap_err();
    assert!(matches!(err, Error::Json(_)));

    settle(&mut core);
    assert_eq!(core.engine_ids(), before);
    handle.collect_garbage();
    assert_eq!(handle.engines_in_flight(), 0);
}

#[test]
fn test_host_parameters() {
    let (mut core, handle) = test_processor();
    handle.set_host_param("slot1_engine", 29.0 / 56.0).unwrap();
    handle.set_host_param("slot1_param2", 0.8).unwrap();
    handle.set_host_param("slot1_mix", 0.25).unwrap();
    handle.set_host_param("slot2_bypass", 1.0).unwrap();
    handle.set_host_param("master_mix", 0.5).unwrap();
    settle(&mut core);

    assert_eq!(core.engine_ids()[0], EngineId(29));
    assert_eq!(handle.slot_params(0).unwrap().get(1), 0.8);
    assert_eq!(handle.slot(0).unwrap().mix(), 0.25);
    assert!(handle.slot(1).unwrap().is_bypassed());
    assert_eq!(handle.master().mix(), 0.5);

    handle.set_host_param("slot1_mix", f32::NAN).unwrap();
    assert_eq!(handle.slot(0).unwrap().mix(), 0.25);
    handle.set_host_param("slot1_mix", 3.0).unwrap();
    assert_eq!(handle.slot(0).unwrap().mix(), 1.0);

    assert!(matches!(
        handle.set_host_param("slot7_mix", 0.5),
        Err(Error::UnknownHostParam(_))
    ));
    assert!(matches!(handle.set_mix(6, 0.5), Err(Error::InvalidSlot(6))));
}

#[test]
fn test_status_snapshot_json() {
    let (mut core, handle) = test_processor();
    handle.set_engine(0, EngineId(29)).unwrap();
    let input = scale(&generate_sine(1000.0, TEST_SAMPLE_RATE, 4096), 0.5);
    render_processor(&mut core, &input, TEST_BUFFER_SIZE);

    let status = handle.status();
    assert_eq!(status.slots.len(), 6);
    assert_eq!(status.slots[0].engine_name, "Classic Tremolo");
    assert_eq!(status.latency_samples, core.latency_samples());
    assert_eq!(status.blocks_processed, 8);
    assert!(status.input.peak > 0.4);
    assert!(status.slots[0].rms > 0.0);
    assert!(!status.has_errors());

    let json: serde_json::Value = serde_json::from_str(&handle.status_json().unwrap()).unwrap();
    assert_eq!(json["slots"][0]["engine_id"], 29);
    assert_eq!(json["slots"][1]["engine_name"], "None");
}

#[test]
fn test_non_finite_output_raises_persistent_error() {
    let (mut core, handle) = test_processor();
    handle.set_engine(0, EngineId(54)).unwrap();
    settle(&mut core);

    let mut block = vec![0.1f32; TEST_BUFFER_SIZE * 2];
    block[10] = f32::NAN;
    core.process_interleaved(&mut block, 2);
    assert!(block.iter().all(|s| s.is_finite()));
    assert!(handle.status().slots[0].error);

    // Clean audio does not clear the flag.
    settle(&mut core);
    assert!(handle.status().has_errors());

    assert!(handle.acknowledge_error(0).unwrap());
    assert!(!handle.acknowledge_error(0).unwrap());
    assert!(!handle.status().has_errors());
}

#[test]
fn test_retired_engines_are_released_after_a_block() {
    let (mut core, handle) = test_processor();
    for id in [29, 54, 2] {
        handle.set_engine(0, EngineId(id)).unwrap();
    }
    assert_eq!(handle.engines_in_flight(), 3);
    assert_eq!(handle.collect_garbage(), 0);

    settle(&mut core);
    assert_eq!(core.engine_ids()[0], EngineId(2));
    assert_eq!(handle.collect_garbage(), 3);
    assert_eq!(handle.engines_in_flight(), 0);
}

#[test]
fn test_swap_queue_backpressure() {
    let (mut core, handle) = ProcessorCore::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BUFFER_SIZE)
        .retire_capacity(2)
        .build()
        .unwrap();
    handle.set_engine(0, EngineId(29)).unwrap();
    handle.set_engine(1, EngineId(54)).unwrap();
    assert!(matches!(
        handle.set_engine(2, EngineId(2)),
        Err(Error::SwapQueueFull(2))
    ));

    settle(&mut core);
    assert_eq!(handle.set_engine(2, EngineId(2)).unwrap(), EngineId(2));
}

#[test]
fn test_unchanged_engine_is_not_rebuilt() {
    let (mut core, handle) = test_processor();
    handle.set_engine(0, EngineId(29)).unwrap();
    settle(&mut core);
    handle.collect_garbage();
    handle.set_engine(0, EngineId(29)).unwrap();
    assert_eq!(handle.engines_in_flight(), 0);
}

fn warm_ring_modulator() -> (ProcessorCore, ProcessorHandle) {
    use hexfx::dsp::engines::ring_modulator::{FEEDBACK, RESONANCE, SHIMMER};
    let (mut core, handle) = test_processor();
    handle.set_engine(0, EngineId(26)).unwrap();
    for (index, value) in [(FEEDBACK, 0.8), (RESONANCE, 0.5), (SHIMMER, 0.5)] {
        assert!(handle.set_slot_param(0, index, value).unwrap());
    }
    settle(&mut core);
    (core, handle)
}

#[test]
fn test_bypassed_ring_modulator_stays_warm() {
    let (mut bypassed, handle) = warm_ring_modulator();
    let (mut reference, _reference_handle) = warm_ring_modulator();
    assert!(EngineFactory::descriptor(EngineId(26)).unwrap().stateful_on_bypass);

    let input = scale(&generate_sine(220.0, TEST_SAMPLE_RATE, 24064 + 2 * 9728), 0.5);
    let (warm, rest) = input.split_at(24064);
    let (during, after) = rest.split_at(9728);

    render_processor(&mut bypassed, warm, TEST_BUFFER_SIZE);
    render_processor(&mut reference, warm, TEST_BUFFER_SIZE);

    handle.set_bypass(0, true).unwrap();
    let out = render_processor(&mut bypassed, during, TEST_BUFFER_SIZE);
    render_processor(&mut reference, during, TEST_BUFFER_SIZE);
    // Past the bypass fade the slot is transparent.
    assert!(signals_approx_equal(
        &out[1024..],
        &during[1024..],
        helpers::tolerances::FLOAT_EPSILON
    ));

    handle.set_bypass(0, false).unwrap();
    let out = render_processor(&mut bypassed, after, TEST_BUFFER_SIZE);
    let expected = render_processor(&mut reference, after, TEST_BUFFER_SIZE);

    // The engine kept running on the bypassed input, so once the fade-in is
    // over it matches an engine that was never bypassed.
    let diff = out[1024..]
        .iter()
        .zip(&expected[1024..])
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(diff < 1e-5, "diverged by {diff}");

    let smooth = max_step(&expected[..1024]).max(max_step(&after[..1024]));
    let step = max_step(&out[..1024]);
    assert!(step <= smooth + 0.01, "step {step} against {smooth}");
}

#[test]
fn test_set_slot_params_applies_snapshot() {
    let (mut core, handle) = test_processor();
    handle.set_engine(2, EngineId(2)).unwrap();
    settle(&mut core);

    let bank = handle.slot_params(2).unwrap();
    let defaults = EngineFactory::descriptor(EngineId(2)).unwrap().default_map();
    bank.set(0, 0.9);
    let snapshot = ParamMap::new().with(1, 0.2).with(40, 0.7);
    handle.set_slot_params(2, &snapshot).unwrap();

    assert_eq!(bank.get(0), defaults.get(0).unwrap());
    assert_eq!(bank.get(1), 0.2);
    assert_eq!(bank.len(), defaults.len());
    assert!(handle.set_slot_params(6, &snapshot).is_err());
}

#[test]
fn test_prepare_to_play_rebuilds_at_new_rate() {
    let (mut core, handle) = test_processor();
    handle.set_engine(0, EngineId(31)).unwrap();
    core.prepare_to_play(44100.0, 256).unwrap();
    assert_eq!(handle.sample_rate(), 44100.0);
    assert_eq!(handle.format().max_block_size, 256);
    assert_eq!(core.engine_ids()[0], EngineId(31));

    let input = scale(&generate_sine(440.0, 44100.0, 4096), 0.5);
    let out = render_processor(&mut core, &input, 256);
    assert!(out.iter().all(|s| s.is_finite()));

    assert!(core.prepare_to_play(0.0, 256).is_err());
    assert!(core.prepare_to_play(44100.0, 0).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_lenient_load_never_rejects_values(
        engine in -10i64..100,
        mix in -2.0f32..3.0,
        values in proptest::collection::vec(-2.0f32..3.0, 0..16),
    ) {
        let (mut core, handle) = test_processor();
        let mut entry = SlotPreset::new(5, EngineId::BYPASS).with_mix(mix).with_parameters(values);
        entry.engine = engine;
        handle.load_preset(&Preset::new("p", "P").with_slot(entry)).unwrap();
        settle(&mut core);

        let shared = handle.slot(5).unwrap();
        prop_assert!((0.0..=1.0).contains(&shared.mix()));
        let params = shared.params();
        for index in 0..params.len() {
            prop_assert!((0.0..=1.0).contains(&params.get(index)));
        }
        let expected = u16::try_from(engine)
            .ok()
            .filter(|&id| id <= EngineId::MAX.0 && EngineFactory::is_available(EngineId(id)));
        match expected {
            Some(id) => prop_assert_eq!(core.engine_ids()[5], EngineId(id)),
            None => prop_assert!(core.engine_ids()[5].is_bypass()),
        }
    }
}
