use std::fs;
use std::path::Path;

use sharpen::image::ImageSize;
use sharpen::imgproc::filter::StencilBounds;
use sharpen::imgproc::sharpen::{SharpenConfig, SharpenError};
use sharpen::io::pgm::{decode_image_pgm_mono16, pgm_size};
use sharpen::io::IoError;
use sharpen::pipeline::{sharpen_file, SharpenFileError};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// a plain-text image with a single bright pixel at (cx, cy) counted from the top left
fn write_bright_pixel(path: &Path, width: usize, height: usize, cx: usize, cy: usize) {
    let mut text = format!("P2\n# bright pixel\n{width} {height}\n255\n");
    for row in 0..height {
        let line = (0..width)
            .map(|col| if (col, row) == (cx, cy) { "255" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ");
        text.push_str(&line);
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_sharpen_file_same_output_for_any_worker_count() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("fuzzy.pgm");
    write_bright_pixel(&input, 32, 32, 16, 16);

    let mut outputs = Vec::new();
    for num_workers in [1, 2, 4] {
        let output = tmp_dir.path().join(format!("sharpened-{num_workers}.pgm"));
        let config = SharpenConfig::new().with_num_workers(num_workers);

        let stats = sharpen_file(&input, &output, &config)?;
        assert_eq!(stats.num_workers, num_workers);
        assert_eq!(stats.filter_size, 17);
        assert_eq!(stats.input_size, ImageSize { width: 32, height: 32 });

        outputs.push(fs::read_to_string(&output)?);
    }
    assert!(outputs.iter().all(|o| *o == outputs[0]));

    let output = tmp_dir.path().join("sharpened-1.pgm");
    assert_eq!(pgm_size(&output)?, ImageSize { width: 16, height: 16 });

    // the bright pixel is the maximum, so it is stretched to 255
    let sharp = decode_image_pgm_mono16(outputs[0].as_bytes(), [16, 16].into())?;
    assert_eq!(sharp.get_pixel(8, 7, 0)?, 255);
    assert!(sharp.as_slice().iter().all(|&v| v <= 255));

    Ok(())
}

#[test]
fn test_sharpen_file_closed_bounds() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("fuzzy.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    write_bright_pixel(&input, 24, 20, 10, 12);

    let config = SharpenConfig::new()
        .with_half_width(4)
        .with_bounds(StencilBounds::Closed)
        .with_num_workers(3);
    let stats = sharpen_file(&input, &output, &config)?;

    assert_eq!(stats.filter_size, 9);
    assert_eq!(pgm_size(&output)?, ImageSize { width: 16, height: 12 });

    Ok(())
}

#[test]
fn test_single_size_token_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("fuzzy.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    fs::write(&input, "P2\n# broken\n32\n255\n0 0 0 0\n")?;

    assert_eq!(pgm_size(&input)?, ImageSize::default());

    let res = sharpen_file(&input, &output, &SharpenConfig::new().with_num_workers(2));
    assert!(matches!(
        res,
        Err(SharpenFileError::SharpenError(
            SharpenError::InvalidDimensions { .. }
        ))
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn test_missing_input_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("missing.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");

    let res = sharpen_file(&input, &output, &SharpenConfig::new().with_num_workers(3));
    assert!(matches!(
        res,
        Err(SharpenFileError::SharpenError(SharpenError::Load(_)))
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn test_small_image_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("small.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    write_bright_pixel(&input, 16, 16, 8, 8);

    let res = sharpen_file(&input, &output, &SharpenConfig::new().with_num_workers(2));
    assert!(matches!(
        res,
        Err(SharpenFileError::SharpenError(
            SharpenError::ImageTooSmall { .. }
        ))
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn test_truncated_input_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("truncated.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    fs::write(&input, "P2\n# short\n20 20\n255\n1 2 3\n")?;

    let res = sharpen_file(&input, &output, &SharpenConfig::new().with_num_workers(2));
    assert!(matches!(
        res,
        Err(SharpenFileError::SharpenError(SharpenError::Load(_)))
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn test_oversized_input_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("large.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    fs::write(&input, "P2\n# large\n60000 60000\n255\n1 2 3\n")?;

    let res = sharpen_file(&input, &output, &SharpenConfig::new().with_num_workers(2));
    let err = match res {
        Err(SharpenFileError::SharpenError(SharpenError::Load(err))) => err,
        other => panic!("expected a load error, got {other:?}"),
    };
    assert!(matches!(
        err.downcast_ref::<IoError>(),
        Some(IoError::ImageTooLarge { .. })
    ));
    assert!(!output.exists());

    // a smaller limit rejects an image that the default accepts
    write_bright_pixel(&input, 32, 32, 16, 16);
    let config = SharpenConfig::new()
        .with_num_workers(2)
        .with_max_size([31, 64].into());
    assert!(sharpen_file(&input, &output, &config).is_err());
    assert!(!output.exists());

    Ok(())
}

#[test]
fn test_overflowing_header_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let input = tmp_dir.path().join("huge.pgm");
    let output = tmp_dir.path().join("sharpened.pgm");
    fs::write(&input, "P2\n# huge\n4294967296 4294967296\n255\n1 2 3\n")?;

    let unlimited = ImageSize {
        width: usize::MAX,
        height: usize::MAX,
    };
    let config = SharpenConfig::new()
        .with_num_workers(2)
        .with_max_size(unlimited);
    let res = sharpen_file(&input, &output, &config);
    assert!(matches!(
        res,
        Err(SharpenFileError::SharpenError(SharpenError::Load(_)))
    ));
    assert!(!output.exists());

    Ok(())
}
