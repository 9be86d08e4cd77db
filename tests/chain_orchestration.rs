mod common;

use common::{only_always, rng, Project, ScriptedProcessor};
use std::fs;
use std::sync::Arc;
use synoid_ytp::{
    ChainOrchestrator, Config, EffectFamily, EffectOverrides, EffectStep, RenderRequest,
    RetentionPolicy, YtpError, CHAIN_ORDER,
};

#[tokio::test]
async fn test_single_invert_is_one_stage_transition() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let config = only_always(&[EffectFamily::Invert]);

    let out = project.output("inverted.mp4");
    let request = RenderRequest::full(project.source(), &out);
    let result = orchestrator
        .render(&config, &request, &mut rng(1))
        .await
        .unwrap();

    assert_eq!(result.applied, vec![EffectStep::Invert]);
    assert_eq!(result.stages.len(), 2, "stage 0 copy plus one effect stage");
    assert!(!result.preview);

    let calls = processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].label(), "invert");
    assert!(calls[0].has_option("-vf", "negate"));
    assert!(calls[0].has_option("-c:a", "copy"));
    assert_eq!(calls[0].inputs(), &[result.stages[0].path.clone()]);

    // Full mode copies the last stage verbatim.
    assert_eq!(fs::read_to_string(&out).unwrap(), "invert output");
}

#[tokio::test]
async fn test_source_file_is_never_mutated() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let result = orchestrator
        .render(
            &only_always(&[EffectFamily::Mirror, EffectFamily::Reverse]),
            &project.full_request("o.mp4"),
            &mut rng(2),
        )
        .await
        .unwrap();

    assert_eq!(fs::read(project.source()).unwrap(), b"source clip");
    assert_eq!(fs::read(&result.stages[0].path).unwrap(), b"source clip");
    assert_ne!(result.stages[0].path, project.source());
    assert!(calls_never_touch(&processor, &project.source()));
}

fn calls_never_touch(processor: &ScriptedProcessor, path: &std::path::Path) -> bool {
    processor
        .calls()
        .iter()
        .all(|c| !c.inputs().iter().any(|p| p == path) && c.output_path() != Some(path))
}

#[tokio::test]
async fn test_stages_chain_into_each_other_and_are_retained() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let config = only_always(&[EffectFamily::Invert, EffectFamily::Mirror, EffectFamily::Chorus]);

    let result = orchestrator
        .render(&config, &project.full_request("o.mp4"), &mut rng(3))
        .await
        .unwrap();

    assert_eq!(processor.labels(), vec!["invert", "mirror", "chorus"]);
    let calls = processor.calls();
    for (i, call) in calls.iter().enumerate() {
        assert_eq!(call.inputs()[0], result.stages[i].path);
        assert_eq!(call.output_path(), Some(result.stages[i + 1].path.as_path()));
    }
    for stage in &result.stages {
        assert!(stage.path.exists(), "stage {} should be kept on disk", stage.index);
        assert!(stage.path.starts_with(&result.staging_dir));
    }
    let indexes: Vec<usize> = result.stages.iter().map(|s| s.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_preview_mode_downscales() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let out = project.output("preview.mp4");
    let result = orchestrator
        .render(
            &only_always(&[EffectFamily::Invert]),
            &RenderRequest::preview(project.source(), &out),
            &mut rng(4),
        )
        .await
        .unwrap();

    assert!(result.preview);
    assert_eq!(processor.labels(), vec!["invert", "preview"]);
    let preview = &processor.calls()[1];
    assert!(preview.has_option("-vf", "scale=640:-2"));
    assert!(preview.has_option("-preset", "veryfast"));
    assert_eq!(preview.inputs()[0], result.stages[1].path);
    assert_eq!(fs::read_to_string(&out).unwrap(), "preview output");
}

#[tokio::test]
async fn test_nothing_fired_still_produces_output() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let out = project.output("same.mp4");
    let result = orchestrator
        .render(&only_always(&[]), &RenderRequest::full(project.source(), &out), &mut rng(5))
        .await
        .unwrap();

    assert!(result.applied.is_empty());
    assert!(processor.calls().is_empty());
    assert_eq!(fs::read(&out).unwrap(), b"source clip");
}

#[tokio::test]
async fn test_failing_stage_aborts_and_writes_no_output() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::failing_on("mirror"));
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let config = only_always(&[EffectFamily::Invert, EffectFamily::Mirror, EffectFamily::Reverse]);

    let out = project.output("never.mp4");
    let err = orchestrator
        .render(&config, &RenderRequest::preview(project.source(), &out), &mut rng(6))
        .await
        .unwrap_err();

    match &err {
        YtpError::Processing { stage, output, .. } => {
            assert_eq!(stage, "stage 2 (mirror)");
            assert!(output.contains("simulated failure"));
        }
        other => panic!("expected a processing error, got {:?}", other),
    }
    // No later stage and no finalize pass ran.
    assert_eq!(processor.labels(), vec!["invert", "mirror"]);
    assert!(!out.exists());
    assert!(no_sidecars_next_to(&out));
}

fn no_sidecars_next_to(out: &std::path::Path) -> bool {
    match fs::read_dir(out.parent().unwrap()) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .all(|e| !e.file_name().to_string_lossy().ends_with(".ytp_tmp")),
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_failing_finalize_writes_no_output() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::failing_on("preview"));
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let out = project.output("never.mp4");
    let err = orchestrator
        .render(
            &only_always(&[EffectFamily::Invert]),
            &RenderRequest::preview(project.source(), &out),
            &mut rng(7),
        )
        .await
        .unwrap_err();

    assert!(err.is_processing());
    assert!(!out.exists());

    // The half-written preview encode is not left behind in the run dir.
    let run_dir = &project.run_dirs()[0];
    let leftovers: Vec<String> = fs::read_dir(run_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(leftovers.iter().all(|n| !n.contains("preview")), "{:?}", leftovers);
    assert!(leftovers.contains(&"step_1.mp4".to_string()));
}

#[tokio::test]
async fn test_failed_run_keeps_staging_even_when_purging() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::failing_on("invert"));
    let orchestrator = ChainOrchestrator::new(processor, project.path());

    let request = RenderRequest::full(project.source(), project.output("x.mp4"))
        .with_retention(RetentionPolicy::PurgeOnSuccess);
    assert!(orchestrator
        .render(&only_always(&[EffectFamily::Invert]), &request, &mut rng(8))
        .await
        .is_err());
    assert_eq!(project.run_dirs().len(), 1);
}

#[tokio::test]
async fn test_successful_run_purges_when_asked() {
    let project = Project::new();
    let orchestrator = ChainOrchestrator::new(Arc::new(ScriptedProcessor::new()), project.path());

    let out = project.output("kept.mp4");
    let request = RenderRequest::full(project.source(), &out)
        .with_retention(RetentionPolicy::PurgeOnSuccess);
    orchestrator
        .render(&only_always(&[EffectFamily::Invert]), &request, &mut rng(9))
        .await
        .unwrap();

    assert!(out.exists());
    assert!(project.run_dirs().is_empty());
}

#[tokio::test]
async fn test_missing_input_is_reported_before_any_invocation() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let err = orchestrator
        .render(
            &only_always(&[EffectFamily::Invert]),
            &RenderRequest::full(
                project.path().join("sources/missing.mp4"),
                project.output("o.mp4"),
            ),
            &mut rng(10),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, YtpError::Io(_)));
    assert!(processor.calls().is_empty());
    assert!(project.run_dirs().is_empty());
}

#[tokio::test]
async fn test_same_seed_same_effects() {
    let project = Project::new();
    project.add_overlay_asset();
    let config = Config::default();

    let mut plans = Vec::new();
    for _ in 0..2 {
        let processor = Arc::new(ScriptedProcessor::new());
        let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
        let result = orchestrator
            .render(&config, &project.full_request("s.mp4"), &mut rng(1234))
            .await
            .unwrap();
        plans.push((result.applied, processor.labels()));
    }
    assert_eq!(plans[0], plans[1]);
}

#[tokio::test]
async fn test_disabled_family_never_invoked() {
    let project = Project::new();
    let overrides = CHAIN_ORDER
        .iter()
        .fold(EffectOverrides::default(), |o, f| o.probability(*f, 1.0))
        .disable(EffectFamily::Reverse)
        .disable(EffectFamily::FrameShuffle);
    let config = Config::default().with_overrides(&overrides);

    for seed in 0..5 {
        let processor = Arc::new(ScriptedProcessor::new());
        let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
        orchestrator
            .render(&config, &project.full_request("d.mp4"), &mut rng(seed))
            .await
            .unwrap();
        let labels = processor.labels();
        assert!(!labels.iter().any(|l| l == "reverse"));
        assert!(!labels.iter().any(|l| l == "frame_extract" || l == "frame_shuffle"));
        assert!(labels.iter().any(|l| l == "invert"));
    }
}

#[tokio::test]
async fn test_overlay_needs_asset_on_disk() {
    let project = Project::new();
    let config = only_always(&[EffectFamily::RainbowOverlay]);

    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let result = orchestrator
        .render(&config, &project.full_request("a.mp4"), &mut rng(11))
        .await
        .unwrap();
    assert!(result.applied.is_empty());
    assert!(processor.calls().is_empty());

    let asset = project.add_overlay_asset();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let result = orchestrator
        .render(&config, &project.full_request("b.mp4"), &mut rng(11))
        .await
        .unwrap();
    assert_eq!(
        result.applied,
        vec![EffectStep::RainbowOverlay { overlay: asset.clone(), x: 0, y: 0 }]
    );
    let call = &processor.calls()[0];
    assert_eq!(call.inputs()[1], asset);
    assert!(call.has_option("-filter_complex", "[0:v][1:v]overlay=0:0:format=auto"));
}

#[tokio::test]
async fn test_stutter_loop_repeats_previous_stage() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let result = orchestrator
        .render(
            &only_always(&[EffectFamily::Invert, EffectFamily::StutterLoop]),
            &project.full_request("st.mp4"),
            &mut rng(12),
        )
        .await
        .unwrap();

    let repeats = match result.applied[1] {
        EffectStep::StutterLoop { repeats } => repeats,
        ref other => panic!("unexpected step {:?}", other),
    };
    assert!((2..=4).contains(&repeats));

    let manifests = processor.manifests();
    assert_eq!(manifests.len(), 1);
    let expected = format!("file '{}'", result.stages[1].path.display());
    assert_eq!(manifests[0].lines().count(), repeats as usize);
    assert!(manifests[0].lines().all(|l| l == expected));

    let call = &processor.calls()[1];
    assert!(call.has_option("-f", "concat"));
    assert!(call.has_option("-c", "copy"));
    // Manifest is cleaned up after the invocation.
    assert!(!call.inputs()[0].exists());
}

#[tokio::test]
async fn test_speed_change_builds_filter_graph() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let result = orchestrator
        .render(
            &only_always(&[EffectFamily::SpeedChange]),
            &project.full_request("sp.mp4"),
            &mut rng(13),
        )
        .await
        .unwrap();

    let speed = match result.applied[0] {
        EffectStep::SpeedChange { speed } => speed,
        ref other => panic!("unexpected step {:?}", other),
    };
    let call = &processor.calls()[0];
    let graph = call.option_value("-filter_complex").unwrap();
    assert_eq!(graph, format!("[0:v]setpts=PTS/{}[v];[0:a]atempo={}[a]", speed, speed));
    assert!(call.has_option("-map", "[v]"));
}

#[tokio::test]
async fn test_configured_parameters_reach_the_library() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let mut config = only_always(&[EffectFamily::SpeedChange, EffectFamily::Earrape]);
    config
        .effects
        .get_mut("speed_change")
        .unwrap()
        .params
        .insert("speeds".into(), serde_json::json!([4.0]));
    config
        .effects
        .get_mut("earrape")
        .unwrap()
        .params
        .insert("gain_db".into(), serde_json::json!(24.0));

    orchestrator
        .render(&config, &project.full_request("p.mp4"), &mut rng(14))
        .await
        .unwrap();

    let calls = processor.calls();
    assert_eq!(
        calls[0].option_value("-filter_complex").unwrap(),
        "[0:v]setpts=PTS/4[v];[0:a]atempo=2,atempo=2[a]"
    );
    assert!(calls[1].has_option("-af", "volume=24dB"));
    assert!(calls[1].has_option("-c:v", "copy"));
}

#[tokio::test]
async fn test_empty_frame_set_aborts() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::extracting(0));
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let out = project.output("shuffled.mp4");
    let err = orchestrator
        .render(
            &only_always(&[EffectFamily::FrameShuffle]),
            &RenderRequest::full(project.source(), &out),
            &mut rng(15),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, YtpError::EmptyFrameSet { .. }));
    assert_eq!(processor.labels(), vec!["frame_extract"]);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_concurrent_runs_do_not_collide() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let config = only_always(&[EffectFamily::Invert, EffectFamily::Mirror]);

    let req_a = RenderRequest::full(project.source(), project.output("a.mp4"));
    let req_b = RenderRequest::full(project.source(), project.output("b.mp4"));
    let mut rng_a = rng(16);
    let mut rng_b = rng(17);

    let (a, b) = tokio::join!(
        orchestrator.render(&config, &req_a, &mut rng_a),
        orchestrator.render(&config, &req_b, &mut rng_b)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.run_id, b.run_id);
    assert_ne!(a.staging_dir, b.staging_dir);
    for stage in &a.stages {
        assert!(!b.stages.iter().any(|s| s.path == stage.path));
    }
    assert_eq!(project.run_dirs().len(), 2);
}

#[tokio::test]
async fn test_no_sources_means_no_invocations() {
    let project = Project::new();
    project.clear_sources();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let err = orchestrator
        .render_source(
            &only_always(&[EffectFamily::Invert]),
            None,
            None,
            true,
            RetentionPolicy::Retain,
            &mut rng(18),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, YtpError::NoSources { .. }));
    assert!(err.to_string().contains("Add video files first"));
    assert!(processor.calls().is_empty());
    assert!(project.run_dirs().is_empty());
    assert!(!project.path().join("temp/preview.mp4").exists());
}

#[tokio::test]
async fn test_render_source_picks_first_source_by_name() {
    let project = Project::new();
    fs::write(project.path().join("sources/a_first.mp4"), b"first clip").unwrap();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());

    let result = orchestrator
        .render_source(
            &only_always(&[EffectFamily::Invert]),
            None,
            None,
            true,
            RetentionPolicy::Retain,
            &mut rng(19),
        )
        .await
        .unwrap();

    assert_eq!(result.output, project.path().join("temp/preview.mp4"));
    assert_eq!(fs::read(&result.stages[0].path).unwrap(), b"first clip");
    assert_eq!(processor.labels(), vec!["invert", "preview"]);

    let named = orchestrator
        .render_source(
            &only_always(&[]),
            Some("clip.mp4"),
            Some(project.output("named.mp4")),
            false,
            RetentionPolicy::Retain,
            &mut rng(20),
        )
        .await
        .unwrap();
    assert_eq!(fs::read(&named.output).unwrap(), b"source clip");
}

#[tokio::test]
async fn test_concurrent_runs_to_one_output_both_commit() {
    let project = Project::new();
    let processor = Arc::new(ScriptedProcessor::new());
    let orchestrator = ChainOrchestrator::new(processor.clone(), project.path());
    let config = only_always(&[EffectFamily::Invert]);

    let out = project.output("shared.mp4");
    let request = RenderRequest::preview(project.source(), &out);
    let mut rng_a = rng(21);
    let mut rng_b = rng(22);

    let (a, b) = tokio::join!(
        orchestrator.render(&config, &request, &mut rng_a),
        orchestrator.render(&config, &request, &mut rng_b)
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(fs::read_to_string(&out).unwrap(), "preview output");
    assert!(no_sidecars_next_to(&out));
}
