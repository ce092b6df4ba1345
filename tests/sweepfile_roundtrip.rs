//! Sweep files written to disk and read back.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use dorade_sweep::config::EightBitScale;
use dorade_sweep::dorade_core::records::{CellVector, ParameterInfo, RadarInfo};
use dorade_sweep::dorade_core::{Compression, SweepFileName};
use dorade_sweep::{RayMapper, SweepDirectory, SweepFileReader, SweepFileWriter, WriterConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 15, 18, 30, 0).unwrap()
}

fn test_mapper(radar: &str) -> RayMapper {
    let mut m = RayMapper::new(RadarInfo::with_name(radar));
    m.add_field(ParameterInfo::new("DBZ", 100.0, 0.0));
    m.add_field(ParameterInfo::new("VEL", 100.0, 0.0));
    m.set_cells(CellVector::new((0..8).map(|i| 150.0 + 150.0 * i as f32).collect()));
    m.set_time(start_time());
    m.swib.fixed_angle = 0.5;
    m
}

fn write_sweep(
    writer: &mut SweepFileWriter,
    m: &mut RayMapper,
    dir: &Path,
    angles: &[f32],
) -> Option<std::path::PathBuf> {
    writer.begin_sweepfile(m, dir, "SUR", None).unwrap();
    for (i, angle) in angles.iter().enumerate() {
        let i = i as i16;
        m.set_pointing(*angle, 0.5);
        m.set_samples(0, vec![1000 + i, -32768, -32768, -32768, 2000, 2100, 2200, 2300]);
        m.set_samples(1, vec![-500, -400 + i, 0, 100, -32768, -32768, 300, 400]);
        writer.add_to_sweepfile(m).unwrap();
    }
    writer.end_sweepfile(false).unwrap()
}

#[test]
fn test_three_ray_sweep_reopened() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut writer = SweepFileWriter::new(WriterConfig::default()).unwrap();
    let mut m = test_mapper("TEST");

    let path = write_sweep(&mut writer, &mut m, temp.path(), &[10.0, 10.0, 200.0]).unwrap();
    assert!(path.to_string_lossy().contains("TEST"));

    let mut reader = SweepFileReader::open(&path).unwrap();
    assert_eq!(reader.ray_count(), 3);
    assert_eq!(reader.mapper().radd.radar_name(), "TEST");
    assert!(matches!(reader.angle_to_ray_num(15.0), Some(0) | Some(1)));
    assert_eq!(reader.angle_to_ray_num(199.0), Some(2));

    reader.read_ray(2).unwrap();
    assert_eq!(reader.mapper().ryib.azimuth, 200.0);
    assert_eq!(reader.mapper().fields[0].samples[0], 1002);
    assert_eq!(reader.mapper().fields[1].samples[1], -398);
}

#[test]
fn test_discarded_sweep_leaves_nothing() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = WriterConfig {
        min_rays_per_sweep: 5,
        ..WriterConfig::default()
    };
    let mut writer = SweepFileWriter::new(config).unwrap();
    let mut m = test_mapper("TEST");

    assert_eq!(write_sweep(&mut writer, &mut m, temp.path(), &[1.0, 2.0]), None);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    let dir = SweepDirectory::new(temp.path());
    assert!(dir.list_tmp().unwrap().is_empty());
}

#[test]
fn test_hrd_sweep_round_trip() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = WriterConfig {
        compression: Compression::Hrd,
        ..WriterConfig::default()
    };
    let mut writer = SweepFileWriter::new(config).unwrap();
    let mut m = test_mapper("HRDT");

    let path = write_sweep(&mut writer, &mut m, temp.path(), &[0.0, 1.0, 2.0, 3.0]).unwrap();
    let mut reader = SweepFileReader::open(&path).unwrap();
    assert_eq!(reader.ray_count(), 4);

    for ray in 0..4i16 {
        if ray > 0 {
            reader.next_ray().unwrap().unwrap();
        }
        let fields = &reader.mapper().fields;
        assert_eq!(
            fields[0].samples,
            vec![1000 + ray, -32768, -32768, -32768, 2000, 2100, 2200, 2300]
        );
        assert_eq!(fields[1].samples, vec![-500, -400 + ray, 0, 100, -32768, -32768, 300, 400]);
    }
    assert_eq!(reader.next_ray().unwrap(), None);
}

#[test]
fn test_eight_bit_sweep_within_quantization() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = WriterConfig {
        eight_bit: Some(vec![EightBitScale { scale: 2.0, bias: -20.0 }; 2]),
        ..WriterConfig::default()
    };
    let mut writer = SweepFileWriter::new(config).unwrap();
    let mut m = test_mapper("BYTE");

    let path = write_sweep(&mut writer, &mut m, temp.path(), &[45.0]).unwrap();
    let reader = SweepFileReader::open(&path).unwrap();

    let (values, bad) = reader.mapper().field_values("DBZ").unwrap();
    let expected = [10.0, 0.0, 0.0, 0.0, 20.0, 21.0, 22.0, 23.0];
    for (cell, (v, e)) in values.iter().zip(expected).enumerate() {
        if (1..4).contains(&cell) {
            assert_eq!(*v, bad);
        } else {
            assert!((v - e).abs() <= 0.25, "cell {}: {} vs {}", cell, v, e);
        }
    }
}

#[test]
fn test_eight_bit_phase_keeps_wide_bad_flag() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let config = WriterConfig {
        eight_bit: Some(vec![EightBitScale { scale: 2.0, bias: 0.0 }]),
        ..WriterConfig::default()
    };
    let mut writer = SweepFileWriter::new(config).unwrap();
    let mut m = RayMapper::new(RadarInfo::with_name("PHAS"));
    m.add_field(ParameterInfo::new("PD", 100.0, 0.0));
    m.set_cells(CellVector::new(vec![150.0, 300.0, 450.0]));
    m.set_time(start_time());

    writer.begin_sweepfile(&m, temp.path(), "SUR", None).unwrap();
    m.set_pointing(90.0, 0.5);
    m.set_samples(0, vec![1000, -32768, 2000]);
    writer.add_to_sweepfile(&m).unwrap();
    let path = writer.end_sweepfile(false).unwrap().unwrap();

    let reader = SweepFileReader::open(&path).unwrap();
    assert_eq!(reader.mapper().parms[0].bad_data, -32768);
    let (values, bad) = reader.mapper().field_values("PD").unwrap();
    assert_eq!(bad, -16384.0);
    assert_eq!(values[1], bad);
    assert!((values[0] - 10.0).abs() <= 0.25, "{}", values[0]);
    assert!((values[2] - 20.0).abs() <= 0.25, "{}", values[2]);
}

#[test]
fn test_directory_retention() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let mut writer = SweepFileWriter::new(WriterConfig::default()).unwrap();
    let mut m = test_mapper("KEEP");

    for minute in 0..4 {
        m.set_time(start_time() + Duration::minutes(minute));
        write_sweep(&mut writer, &mut m, temp.path(), &[0.0, 1.0]).unwrap();
    }

    let dir = SweepDirectory::new(temp.path());
    let names = dir.list(None, None).unwrap();
    assert_eq!(names.len(), 4);
    assert_eq!(dir.time_span().unwrap(), 180.0);

    assert_eq!(dir.clean(2, None).unwrap(), 2);
    let kept = dir.list(None, None).unwrap();
    assert_eq!(kept, names[2..].to_vec());
    let oldest = SweepFileName::parse(&kept[0]);
    assert_eq!(oldest.time, start_time() + Duration::minutes(2));
}
