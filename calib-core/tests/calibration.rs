use calib_core::{CalibrationSession, Column, SourceLibrary};

fn parse(text: &str) -> f64 {
    text.parse().unwrap()
}

#[test]
fn calibrate_with_builtin_sources() {
    let library = SourceLibrary::builtin();
    let mut session = CalibrationSession::new();
    for name in ["Cs-137", "Co-60"] {
        session.add_source(name, library.get(name).unwrap());
    }
    assert_eq!(session.rows().len(), 3);

    // Detector response: E = 0.5 * ch + 2
    for row in 0..session.rows().len() {
        let energy: f64 = parse(&session.rows()[row].energy);
        let channel = 2.0 * (energy - 2.0);
        session.set_cell(row, Column::Channel, channel.to_string());
    }

    let fit = session.fit().expect("three lines give a linear fit");
    assert!((fit.coefficients()[0] - 0.5).abs() < 1e-9);
    assert!((fit.coefficients()[1] - 2.0).abs() < 1e-6);
    assert!(session.chi2().unwrap() < 1e-12);
    assert!(session.fit_text().starts_with("Energy = 0.500000*Chan + "));

    assert!((parse(&session.convert_forward("1000")) - 502.0).abs() < 1e-6);
    assert!((parse(&session.convert_reverse("502")) - 1000.0).abs() < 1e-6);
}

#[test]
fn quadratic_calibration_round_trip() {
    let mut session = CalibrationSession::with_degree("2");
    let channels = [150.0, 800.0, 1600.0, 2400.0, 3300.0];
    for (row, channel) in channels.iter().enumerate() {
        if row > 0 {
            session.add_row();
        }
        let energy = 2e-5 * channel * channel + 0.3 * channel + 5.0;
        session.set_cell(row, Column::Channel, channel.to_string());
        session.set_cell(row, Column::Energy, energy.to_string());
        session.set_cell(row, Column::Comment, format!("peak {row}"));
    }

    let fit = session.fit().expect("five points fit a quadratic");
    assert_eq!(fit.degree(), 2);

    // The parabola reaches this energy twice; only one branch is at a positive channel.
    let energy = fit.evaluate(1200.0);
    let roots: Vec<f64> = session
        .convert_reverse(&energy.to_string())
        .split(", ")
        .map(parse)
        .collect();
    assert_eq!(roots.len(), 2);
    assert!(roots[0] < 0.0);
    assert!((roots[1] - 1200.0).abs() < 1e-6);
}
