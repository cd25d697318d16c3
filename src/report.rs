// 出力サイズ比較: 各バリアントのバイト数と、ロスレス非マスク版に対する比率

use crate::config::job::Variant;
use crate::pipeline::job_runner::VariantOutput;

/// Sizes of the documents one job produced.
pub struct SizeReport<'a> {
    outputs: &'a [VariantOutput],
}

impl<'a> SizeReport<'a> {
    pub fn new(outputs: &'a [VariantOutput]) -> Self {
        Self { outputs }
    }

    /// Size of the lossless unmasked document, the comparison baseline.
    pub fn baseline_bytes(&self) -> Option<u64> {
        self.bytes_of(Variant::UnmaskedLossless)
    }

    pub fn bytes_of(&self, variant: Variant) -> Option<u64> {
        self.outputs
            .iter()
            .find(|o| o.variant == variant)
            .map(|o| o.bytes)
    }

    /// `size(variant) / size(baseline)`, when both exist and the baseline is non-empty.
    pub fn ratio(&self, variant: Variant) -> Option<f64> {
        let baseline = self.baseline_bytes().filter(|&b| b > 0)?;
        Some(self.bytes_of(variant)? as f64 / baseline as f64)
    }

    /// One line per output: ratio to baseline (or `-`), size in MB, path.
    pub fn render(&self) -> String {
        self.outputs
            .iter()
            .map(|o| {
                let ratio = self
                    .ratio(o.variant)
                    .map_or_else(|| "   -".to_string(), |r| format!("{r:4.2}"));
                format!(
                    "{ratio} {:6.2} MB {:<17} {}",
                    o.bytes as f64 / 1e6,
                    o.variant.as_str(),
                    o.path.display()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn output(variant: Variant, bytes: u64) -> VariantOutput {
        VariantOutput {
            variant,
            path: PathBuf::from(format!("out.{}.pdf", variant.output_suffix())),
            bytes,
        }
    }

    #[test]
    fn test_ratio_against_lossless_baseline() {
        let outputs = vec![
            output(Variant::Masked, 250),
            output(Variant::UnmaskedLossless, 1000),
        ];
        let report = SizeReport::new(&outputs);
        assert_eq!(report.ratio(Variant::Masked), Some(0.25));
        assert_eq!(report.ratio(Variant::UnmaskedLossless), Some(1.0));
        assert!(report.render().contains("0.25"));
    }

    #[test]
    fn test_no_baseline_no_ratio() {
        let outputs = vec![output(Variant::Masked, 250)];
        let report = SizeReport::new(&outputs);
        assert_eq!(report.ratio(Variant::Masked), None);
        assert!(report.render().contains("masked"));
    }
}
