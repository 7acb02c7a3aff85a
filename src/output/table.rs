use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::core::session::SessionOutput;
use crate::shared::constants::CSV_DECIMALS;

pub fn format_value(value: f64) -> String {
    format!("{:.*}", CSV_DECIMALS, value)
}

/// Header `ts,<joint>...`, then one row per record.
pub fn write_csv<W: Write>(writer: W, output: &SessionOutput) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["ts"];
    header.extend(output.joints.iter().copied());
    wtr.write_record(&header)?;

    for record in &output.records {
        let mut row = Vec::with_capacity(record.angles.len() + 1);
        row.push(format_value(record.ts));
        row.extend(record.angles.iter().map(|a| format_value(*a)));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn save_csv(path: &Path, output: &SessionOutput) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))?;
    write_csv(file, output).with_context(|| format!("Failed to write CSV: {}", path.display()))?;
    crate::utils::logger::info(&format!("Wrote {} rows to {}", output.records.len(), path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::joints::{joint_names, AngleRecord};

    #[test]
    fn test_rounds_to_two_decimals() {
        assert_eq!(format_value(179.99999), "180.00");
        assert_eq!(format_value(0.004), "0.00");
        assert_eq!(format_value(1.0 / 3.0), "0.33");
    }

    #[test]
    fn test_csv_layout() {
        let output = SessionOutput {
            joints: joint_names(),
            records: vec![AngleRecord {
                frame_index: 4,
                ts: 0.1333,
                angles: vec![179.6, 170.25, 90.0, 175.556],
                right_side: false,
            }],
            frames_read: 5,
            frames_skipped: 4,
            stopped_early: false,
        };

        let mut buf = Vec::new();
        write_csv(&mut buf, &output).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "ts,Knee,Hip,Elbow,Torso-Fwd\n0.13,179.60,170.25,90.00,175.56\n");
    }
}
