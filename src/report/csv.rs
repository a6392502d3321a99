//! CSV report: one row per image, labels flattened into columns

use crate::error::Result;
use crate::food::FoodReport;
use std::io::Write;

const HEADER: [&str; 17] = [
    "file_path",
    "file_name",
    "width",
    "height",
    "avg_saturation",
    "avg_brightness",
    "texture",
    "salt_estimate",
    "salt_delta",
    "food_type",
    "stimulation_level",
    "flavor_intensity",
    "saturation_percent",
    "peak_hue",
    "peak_saturation",
    "recommendation",
    "error",
];

pub fn write<W: Write>(writer: W, reports: &[FoodReport]) -> Result<()> {
    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;

    for r in reports {
        let mut row = vec![r.file_path.clone(), r.file_name.clone()];
        match &r.analysis {
            Some(a) => {
                let s = &a.statistics;
                let (peak_hue, peak_saturation, _) = s.color_hist.peak();
                row.extend([
                    s.width.to_string(),
                    s.height.to_string(),
                    format!("{:.2}", s.avg_saturation),
                    format!("{:.2}", s.avg_brightness),
                    format!("{:.2}", s.texture),
                    a.salt_estimate.to_string(),
                    a.salt_delta.to_string(),
                    a.food_type.to_string(),
                    a.stimulation_level.to_string(),
                    a.flavor_intensity.to_string(),
                    a.saturation_percent.to_string(),
                    peak_hue.to_string(),
                    peak_saturation.to_string(),
                    a.recommendation.to_string(),
                ]);
            }
            None => row.extend(std::iter::repeat(String::new()).take(HEADER.len() - 3)),
        }
        row.push(r.error.clone().unwrap_or_default());
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}
