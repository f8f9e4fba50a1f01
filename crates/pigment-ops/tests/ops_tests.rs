//! Integration tests for the convolution painters, the math toolbox and
//! inpainting, driven through the public API only.

use pigment_core::{ColorDepthId, ColorModelId, ColorSpace, ColorSpaceRegistry, Rect};
use pigment_ops::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Opaque noise image.
fn noise(registry: &ColorSpaceRegistry, depth: ColorDepthId, w: i32, h: i32, seed: u64) -> PaintDevice {
    let cs = registry.color_space(ColorModelId::Rgb, depth, None).unwrap();
    let bounds = Rect::new(0, 0, w, h);
    let mut device = PaintDevice::new(cs.clone(), bounds).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = vec![0f32; cs.channel_count()];
    let alpha = cs.alpha_pos().unwrap();
    for (x, y) in bounds.iter_coords() {
        for (i, v) in values.iter_mut().enumerate() {
            *v = if i == alpha { 1.0 } else { rng.r#gen::<f32>() };
        }
        if let Some(px) = device.pixel_mut(x, y) {
            cs.from_normalised_channels_value(px, &values);
        }
    }
    device
}

fn max_u8_diff(cs: &dyn ColorSpace, a: &[u8], b: &[u8]) -> i32 {
    (0..cs.channel_count())
        .map(|c| (cs.scale_to_u8(a, c) as i32 - cs.scale_to_u8(b, c) as i32).abs())
        .max()
        .unwrap_or(0)
}

// ============================================================================
// Convolution
// ============================================================================

#[test]
fn spatial_and_fft_agree() {
    init_tracing();
    let registry = ColorSpaceRegistry::with_defaults();
    let kernel = ConvolutionKernel::gaussian(9, 2.5);
    for depth in [ColorDepthId::U8, ColorDepthId::U16] {
        let src = noise(&registry, depth, 48, 40, 17);
        let rect = src.extent();
        let mut spatial = src.empty_like().unwrap();
        let mut fft = src.empty_like().unwrap();

        let painter = ConvolutionPainter::new().with_edge_policy(EdgePolicy::Repeat);
        painter
            .with_engine(ConvolutionEngine::Spatial)
            .apply_matrix(&kernel, &src, rect, &mut spatial, (0, 0))
            .unwrap();
        painter
            .with_engine(ConvolutionEngine::Fft)
            .apply_matrix(&kernel, &src, rect, &mut fft, (0, 0))
            .unwrap();

        let cs = src.color_space();
        for (x, y) in rect.iter_coords() {
            let d = max_u8_diff(&**cs, spatial.pixel(x, y), fft.pixel(x, y));
            assert!(d <= 1, "{:?} ({}, {}) differs by {}", depth, x, y, d);
        }
    }
}

#[test]
fn box_blur_averages_neighbourhood() {
    init_tracing();
    let registry = ColorSpaceRegistry::with_defaults();
    let src = noise(&registry, ColorDepthId::U8, 256, 256, 4);
    let mut dst = src.empty_like().unwrap();
    ConvolutionPainter::new()
        .apply_matrix(&ConvolutionKernel::box_blur(3), &src, src.extent(), &mut dst, (0, 0))
        .unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..200 {
        let (x, y) = (rng.gen_range(1..255), rng.gen_range(1..255));
        for c in 0..3 {
            let sum: u32 = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .map(|(dx, dy)| src.pixel(x + dx, y + dy)[c] as u32)
                .sum();
            let expected = (sum as f64 / 9.0).round() as i32;
            assert!((dst.pixel(x, y)[c] as i32 - expected).abs() <= 1);
        }
        assert_eq!(dst.pixel(x, y)[3], 255);
    }

    // Averaging keeps the overall mean.
    let mean = |d: &PaintDevice| -> f64 {
        let r = Rect::new(8, 8, 240, 240);
        r.iter_coords().map(|(x, y)| d.pixel(x, y)[1] as f64).sum::<f64>() / r.area() as f64
    };
    assert!((mean(&src) - mean(&dst)).abs() < 1.0);
}

#[test]
fn cancelled_convolution_is_ok() {
    let registry = ColorSpaceRegistry::with_defaults();
    let src = noise(&registry, ColorDepthId::U8, 32, 32, 1);
    let mut dst = src.empty_like().unwrap();
    let progress = ProgressCounter::new();
    progress.cancel();
    for engine in [ConvolutionEngine::Spatial, ConvolutionEngine::Fft] {
        ConvolutionPainter::new()
            .with_engine(engine)
            .with_progress(&progress)
            .apply_matrix(&ConvolutionKernel::box_blur(7), &src, src.extent(), &mut dst, (0, 0))
            .unwrap();
    }
}

#[test]
fn convolution_config_from_yaml() {
    let bag = PropertyBag::from_yaml("factor: 4.0\noffset: 0.0\nengine: spatial\nedge: repeat\n").unwrap();
    let config = ConvolutionConfig::from_bag(&bag).unwrap();
    assert_eq!(config.engine, ConvolutionEngine::Spatial);
    assert_eq!(config.edge, EdgePolicy::Repeat);

    let registry = ColorSpaceRegistry::with_defaults();
    let bounds = Rect::new(0, 0, 8, 8);
    let src = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, vec![100; 8 * 8 * 4]).unwrap();
    let mut dst = src.empty_like().unwrap();
    let kernel = ConvolutionKernel::from_matrix(3, 3, vec![0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    ConvolutionPainter::from_config(&config)
        .apply_matrix(&kernel, &src, bounds, &mut dst, (0, 0))
        .unwrap();
    assert_eq!(dst.pixel(0, 0)[0], 50);
}

// ============================================================================
// Math toolbox
// ============================================================================

#[test]
fn wavelet_round_trip_through_registry() {
    init_tracing();
    let registry = ColorSpaceRegistry::with_defaults();
    let toolboxes = MathToolboxRegistry::new();
    let src = noise(&registry, ColorDepthId::U16, 21, 13, 8);
    let toolbox = toolboxes.for_color_space(&**src.color_space());
    assert_eq!(toolbox.id(), "Basic");

    let rect = Rect::new(2, 1, 17, 11);
    let mut wav = toolbox
        .fast_wavelet_transformation(&src, rect, None, &NoProgress)
        .unwrap();
    assert_eq!(wav.size(), 32);
    assert_eq!(wav.depth(), 3);

    let mut dst = src.clone();
    toolbox
        .fast_wavelet_untransformation(&mut dst, rect, &mut wav, None, &NoProgress)
        .unwrap();
    let cs = src.color_space();
    for (x, y) in rect.iter_coords() {
        assert!(max_u8_diff(&**cs, src.pixel(x, y), dst.pixel(x, y)) <= 1);
    }
}

#[test]
fn wavelet_flat_image_has_no_detail() {
    let registry = ColorSpaceRegistry::with_defaults();
    let bounds = Rect::new(0, 0, 16, 16);
    let src = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, vec![77; 16 * 16 * 4]).unwrap();
    let wav = BasicMathToolbox
        .fast_wavelet_transformation(&src, bounds, None, &NoProgress)
        .unwrap();
    for y in 0..16 {
        for x in 0..16 {
            if (x, y) == (0, 0) {
                continue;
            }
            for c in 0..3 {
                assert!(wav.value(x, y, c).abs() < 1e-3, "({}, {}) ch{}", x, y, c);
            }
        }
    }
}

// ============================================================================
// Inpainting
// ============================================================================

#[test]
fn inpaint_fills_from_known_pixels() {
    init_tracing();
    let registry = ColorSpaceRegistry::with_defaults();
    let bounds = Rect::new(0, 0, 80, 60);
    let data = bounds
        .iter_coords()
        .flat_map(|(x, y)| [(x * 3) as u8, (y * 3) as u8, 40, 255])
        .collect();
    let mut image = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, data).unwrap();
    let hole = Rect::new(35, 25, 7, 6);
    image.fill(hole, &[255, 0, 255, 255]);
    let before = image.clone();

    let mut mask = PaintDevice::new(registry.alpha8().unwrap(), bounds).unwrap();
    mask.fill(hole, &[200]);

    let config = InpaintConfig {
        radius: 2,
        accuracy: 25,
        seed: 42,
    };
    let rect = patch_image_with_config(&mut image, &mask, &config, None, &NoProgress).unwrap();
    assert_eq!(rect, Rect::new(21, 13, 35, 30));

    for (x, y) in bounds.iter_coords() {
        if !rect.contains(x, y) {
            assert_eq!(image.pixel(x, y), before.pixel(x, y));
        }
    }
    for (x, y) in hole.iter_coords() {
        let px = image.pixel(x, y);
        assert!(px[2].abs_diff(40) <= 1, "({}, {}) = {:?}", x, y, px);
        assert_eq!(px[3], 255);
    }
}

#[test]
fn inpaint_selection_limits_write_back() {
    let registry = ColorSpaceRegistry::with_defaults();
    let bounds = Rect::new(0, 0, 40, 40);
    let mut image = PaintDevice::from_bytes(
        registry.rgb8().unwrap(),
        bounds,
        [60u8, 120, 180, 255].repeat(40 * 40),
    )
    .unwrap();
    let hole = Rect::new(18, 18, 4, 4);
    image.fill(hole, &[0, 0, 0, 255]);
    let mut mask = PaintDevice::new(registry.alpha8().unwrap(), bounds).unwrap();
    mask.fill(hole, &[255]);
    // Only the left half of the hole is selected.
    let mut selection = PaintDevice::new(registry.alpha8().unwrap(), bounds).unwrap();
    selection.fill(Rect::new(0, 0, 20, 40), &[255]);

    patch_image(&mut image, &mask, 2, 50, Some(&selection), &NoProgress).unwrap();
    for (x, y) in hole.iter_coords() {
        let px = image.pixel(x, y);
        if x < 20 {
            assert_eq!(&px[..3], &[60, 120, 180]);
        } else {
            assert_eq!(&px[..3], &[0, 0, 0]);
        }
    }
}
