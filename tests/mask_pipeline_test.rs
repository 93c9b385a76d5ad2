//! End-to-end tests for the mask synthesis pipeline.

use slm_bessel::mask::compositor::generate;
use slm_bessel::params::MaskParameters;
use slm_bessel::preview::{DeviceStatus, PreviewPipeline};

fn params() -> MaskParameters {
    MaskParameters {
        dimensions: (96, 64),
        ..Default::default()
    }
}

#[test]
fn disabled_parameters_render_an_all_zero_mask() {
    let p = MaskParameters {
        axicon1_enabled: false,
        axicon2_enabled: false,
        lens_enabled: false,
        ..params()
    };
    let mask = generate(&p).unwrap();
    assert!(mask.iter().all(|&v| v == 0));
}

#[test]
fn identical_parameters_render_identical_masks() {
    let p = MaskParameters {
        axicon2_enabled: true,
        lens_enabled: true,
        lens_focal_length: -500.0,
        ellipticity: (15.0, 5.0),
        offset: (7, -3),
        ..params()
    };
    assert_eq!(generate(&p).unwrap(), generate(&p).unwrap());
}

#[test]
fn mask_values_always_fit_a_gray_level() {
    // u8 output makes this structural, but the composition must also never
    // panic for awkward parameter mixes.
    for period in [1, 2, 7, 30, 255, 1000] {
        let p = MaskParameters {
            period1: period,
            axicon2_enabled: true,
            period2: period + 1,
            lens_enabled: true,
            lens_focal_length: 123.0,
            ..params()
        };
        let mask = generate(&p).unwrap();
        assert_eq!(mask.dim(), (64, 96));
    }
}

#[test]
fn preview_pipeline_stays_alive_without_hardware() {
    let mut pipeline = PreviewPipeline::detached();
    let frame = pipeline.refresh(&params()).unwrap();
    assert_eq!(frame.device, DeviceStatus::Detached);

    // A parameter edit triggers a full regeneration.
    let edited = MaskParameters {
        period1: 11,
        ..params()
    };
    let second = pipeline.refresh(&edited).unwrap();
    assert_ne!(frame.mask, second.mask);
}

#[test]
fn ellipticity_changes_the_rendered_mask() {
    let circular = generate(&params()).unwrap();
    let elliptical = generate(&MaskParameters {
        ellipticity: (45.0, 0.0),
        ..params()
    })
    .unwrap();
    assert_ne!(circular, elliptical);
}
