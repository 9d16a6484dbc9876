//! The unit of work the scheduler runs on every active tick.

use image::RgbImage;

use crate::ingest::FrameSource;
use crate::pipeline::{format_labels, DetectionPipeline, PipelineRun};
use crate::results::{ResultLog, ResultRecord};

/// Acquire one frame, run the pipeline, and format the labels.
///
/// Per-tick failures are logged and the tick yields nothing; the loop keeps
/// going.
pub struct LabelJob {
    source: Box<dyn FrameSource>,
    pipeline: DetectionPipeline,
    results: Option<ResultLog>,
}

impl LabelJob {
    pub fn new(source: Box<dyn FrameSource>, pipeline: DetectionPipeline) -> Self {
        Self {
            source,
            pipeline,
            results: None,
        }
    }

    pub fn with_results(mut self, results: ResultLog) -> Self {
        self.results = Some(results);
        self
    }

    /// Run one tick. `None` means there is nothing to deliver.
    pub fn tick(&mut self) -> Option<String> {
        let frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame unavailable from {}: {:#}", self.source.describe(), err);
                return None;
            }
        };
        let run = self.process(&frame)?;
        if run.labels.is_empty() {
            return None;
        }
        if let Some(results) = &self.results {
            if let Err(err) = results.append(&ResultRecord::from_run(&run)) {
                log::warn!("failed to record result: {:#}", err);
            }
        }
        Some(format_labels(&run.labels))
    }

    fn process(&mut self, frame: &RgbImage) -> Option<PipelineRun> {
        match self.pipeline.run_detailed(frame) {
            Ok(run) => {
                log::debug!(
                    "tick: {} detections (localize {:?}, classify {:?})",
                    run.detections.len(),
                    run.localize_time,
                    run.classify_time
                );
                Some(run)
            }
            Err(err) => {
                log::error!("inference failed: {:#}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};

    use super::*;
    use crate::config::PipelineConfig;
    use crate::detect::{
        ClassNames, ClassTable, ClassificationStage, LocalizationStage, ScriptedEngine, Tensor,
    };
    use crate::ingest::SyntheticSource;

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        fn next_frame(&mut self) -> Result<RgbImage> {
            Err(anyhow!("camera unplugged"))
        }
    }

    fn pipeline(detector: ScriptedEngine) -> DetectionPipeline {
        let config = PipelineConfig::default();
        let classifier =
            ScriptedEngine::new(Tensor::new(vec![1, 2], vec![0.9, 0.1]).expect("tensor"));
        DetectionPipeline::new(
            LocalizationStage::new(
                Box::new(detector),
                ClassNames::from_lines("Traffic Sign\nCar\n").expect("names"),
                &config,
            ),
            ClassificationStage::new(
                Box::new(classifier),
                ClassTable::from_csv("ClassId,ClassName\n0,Stop\n1,Yield\n").expect("table"),
                &config,
            ),
        )
    }

    fn one_sign_and_one_car() -> ScriptedEngine {
        ScriptedEngine::new(
            Tensor::new(
                vec![1, 2, 7],
                vec![
                    0.25, 0.25, 0.2, 0.2, 0.9, 1.0, 0.0, // sign
                    0.75, 0.75, 0.2, 0.2, 0.8, 0.0, 1.0, // car
                ],
            )
            .expect("tensor"),
        )
    }

    #[test]
    fn tick_formats_labels_in_confidence_order() {
        let mut job = LabelJob::new(
            Box::new(SyntheticSource::new("stub://test", 64, 48)),
            pipeline(one_sign_and_one_car()),
        );
        assert_eq!(job.tick().as_deref(), Some("Stop, Car"));
    }

    #[test]
    fn frame_failure_yields_nothing_and_job_survives() {
        let mut job = LabelJob::new(Box::new(BrokenSource), pipeline(one_sign_and_one_car()));
        assert_eq!(job.tick(), None);
        assert_eq!(job.tick(), None);
    }

    #[test]
    fn inference_failure_yields_nothing() {
        let mut job = LabelJob::new(
            Box::new(SyntheticSource::new("stub://test", 64, 48)),
            pipeline(ScriptedEngine::failing("accelerator fault")),
        );
        assert_eq!(job.tick(), None);
    }

    #[test]
    fn empty_frame_yields_nothing_and_records_nothing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let detector =
            ScriptedEngine::new(Tensor::new(vec![1, 1, 7], vec![0.5, 0.5, 0.1, 0.1, 0.1, 1.0, 0.0])?);
        let mut job = LabelJob::new(
            Box::new(SyntheticSource::new("stub://test", 64, 48)),
            pipeline(detector),
        )
        .with_results(ResultLog::open(dir.path())?);
        assert_eq!(job.tick(), None);
        assert!(ResultLog::open(dir.path())?.read_all()?.is_empty());
        Ok(())
    }

    #[test]
    fn delivered_ticks_are_recorded() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut job = LabelJob::new(
            Box::new(SyntheticSource::new("stub://test", 64, 48)),
            pipeline(one_sign_and_one_car()),
        )
        .with_results(ResultLog::open(dir.path())?);
        job.tick();
        job.tick();
        let records = ResultLog::open(dir.path())?.read_all()?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].labels, vec!["Stop".to_string(), "Car".to_string()]);
        Ok(())
    }
}
