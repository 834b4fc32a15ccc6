use mandelpool_core::{evaluate, Algorithm, Complex, RenderParams, Viewport};

/// Evaluate every pixel of a viewport in row-major order.
fn render_grid(params: &RenderParams, viewport: &Viewport) -> Vec<f64> {
    let mut values = Vec::with_capacity(viewport.pixel_count());
    for py in 0..viewport.height {
        for px in 0..viewport.width {
            values.push(evaluate(params, viewport.pixel_to_complex(px, py)));
        }
    }
    values
}

#[test]
fn headless_mandelbrot_render() {
    let params = RenderParams::default()
        .with_algorithm(Algorithm::EscapeTime)
        .with_max_iterations(256)
        .with_max_radius(2.0);
    let viewport = Viewport::fitted(100, 100).unwrap();

    let values = render_grid(&params, &viewport);
    assert_eq!(values.len(), 100 * 100);

    let interior = values.iter().filter(|&&v| v >= 256.0).count();
    let escaped = values.len() - interior;
    assert!(escaped > 0, "should have some escaped points");
    assert!(interior > 0, "should have some interior points");
}

#[test]
fn headless_render_is_deterministic() {
    let params = RenderParams::default();
    let viewport = Viewport::fitted(80, 60).unwrap();
    assert_eq!(render_grid(&params, &viewport), render_grid(&params, &viewport));
}

#[test]
fn headless_burning_ship_render() {
    let params = RenderParams::default()
        .with_algorithm(Algorithm::BurningShip)
        .with_max_iterations(100)
        .with_max_radius(2.0);
    let viewport = Viewport::new(Complex::new(-2.0, 2.0), 0.04, 100, 100).unwrap();

    let values = render_grid(&params, &viewport);
    assert!(values.iter().all(|v| v.fract() == 0.0));
    assert!(values.iter().any(|&v| v >= 100.0));
    assert!(values.iter().any(|&v| v < 100.0));
}

#[test]
fn interior_check_toggle_is_invisible() {
    let viewport = Viewport::fitted(120, 80).unwrap();
    for algorithm in [Algorithm::EscapeTime, Algorithm::NormalizedIterationCount] {
        let on = RenderParams::default()
            .with_algorithm(algorithm)
            .with_max_iterations(150)
            .with_interior_check(true);
        let off = on.with_interior_check(false);
        assert_eq!(render_grid(&on, &viewport), render_grid(&off, &viewport));
    }
}
