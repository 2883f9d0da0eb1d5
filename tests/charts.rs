// End-to-end: a simulated exciter feeds the poller, the charts render from
// its history and land on disk as PNGs.

use std::time::Duration;

use tokio::time::sleep;
use txmon::chart::level::{self, LevelPlan};
use txmon::chart::line::{self, LinePlan};
use txmon::{ChartRenderer, HistoryPoint, PollConfig, Poller, SimulatedAgent};

fn point(ts: i64, fwd: Option<f64>, refl: Option<f64>, left: Option<f64>, right: Option<f64>) -> HistoryPoint {
    HistoryPoint {
        timestamp_ms: ts,
        forward_power_w: fwd,
        reflected_power_w: refl,
        level_left: left,
        level_right: right,
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulated_history_renders() {
    let poller = Poller::new(SimulatedAgent::with_seed(42));
    poller.start(PollConfig::new("sim", 161, 5).unwrap(), false).await.unwrap();
    sleep(Duration::from_secs(60)).await;
    poller.stop().await;

    let history = poller.history().await;
    assert!(history.len() >= 12);

    let renderer = ChartRenderer::new(640, 200);
    let layout = *renderer.layout();
    match line::plan(&history, &layout) {
        LinePlan::Plot(plot) => {
            assert_eq!(plot.forward.len(), 1);
            assert_eq!(plot.forward[0].len(), history.len());
            assert!(plot.range.min >= 0.0);
        }
        LinePlan::NoData => panic!("simulated power should chart"),
    }
    assert!(matches!(level::plan(&history, &layout), LevelPlan::Plot(_)));

    let dir = tempfile::tempdir().unwrap();
    let power = renderer.render_power(&history).unwrap();
    let levels = renderer.render_levels(&history).unwrap();
    ChartRenderer::save_png(&power, &dir.path().join("power.png")).unwrap();
    ChartRenderer::save_png(&levels, &dir.path().join("levels.png")).unwrap();

    let bytes = std::fs::read(dir.path().join("levels.png")).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    assert_eq!((power.width(), power.height()), (640, 200));
}

#[test]
fn test_empty_history_renders_placeholder() {
    let renderer = ChartRenderer::new(300, 120);
    let blank = renderer.render_power(&[]).unwrap();
    let single = renderer.render_power(&[point(0, Some(10.0), None, None, None)]).unwrap();
    // both are the placeholder frame
    assert_eq!(blank.data(), single.data());

    let levels = renderer
        .render_levels(&[point(0, Some(1.0), None, None, None), point(1, Some(1.0), None, None, None)])
        .unwrap();
    let placeholder = renderer.render_levels(&[]).unwrap();
    assert_eq!(levels.data(), placeholder.data());
}

#[test]
fn test_gappy_history_renders() {
    let points: Vec<_> = (0..30)
        .map(|i| {
            let gap = i % 7 == 3;
            point(
                i * 5_000,
                (!gap).then_some(100.0 + (i % 5) as f64),
                (i % 2 == 0).then_some(1.5),
                (!gap).then_some((i * 9 % 256) as f64),
                (i % 4 != 0).then_some(300.0),
            )
        })
        .collect();
    let renderer = ChartRenderer::new(500, 180);
    renderer.render_power(&points).unwrap();
    renderer.render_levels(&points).unwrap();

    match line::plan(&points, renderer.layout()) {
        LinePlan::Plot(plot) => assert!(plot.forward.len() > 1),
        LinePlan::NoData => panic!("expected a plot"),
    }
}
