use std::time::Duration;

use anyhow::Context;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use fractal_engine::core::{App, AppControl, FrameCtx};
use fractal_engine::device::GpuInit;
use fractal_engine::fractal::FractalPipeline;
use fractal_engine::graphics::WgpuBackend;
use fractal_engine::logging::{LoggingConfig, init_logging};
use fractal_engine::time::FrameStats;
use fractal_engine::window::{Runtime, RuntimeConfig};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn main() {
    init_logging(LoggingConfig::default());

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig {
        title: "Mandelbrot".to_string(),
        ..RuntimeConfig::default()
    };
    Runtime::run(config, GpuInit::default(), Viewer::new()).context("fractal viewer failed")
}

/// Owns the backend and the pipeline. Both are created on the first frame,
/// once a device exists.
struct Viewer {
    backend: Option<WgpuBackend>,
    pipeline: Option<FractalPipeline>,
    stats: FrameStats,
}

impl Viewer {
    fn new() -> Self {
        Self {
            backend: None,
            pipeline: None,
            stats: FrameStats::new(STATS_INTERVAL),
        }
    }
}

impl App for Viewer {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if let Some(report) = self.stats.record(&ctx.time) {
            log::debug!(
                "{} frames, {:.2} ms avg ({:.1} fps)",
                report.frames,
                report.average_dt * 1000.0,
                report.fps()
            );
        }

        let backend = self.backend.get_or_insert_with(|| {
            WgpuBackend::new(
                ctx.gpu.device().clone(),
                ctx.gpu.queue().clone(),
                ctx.gpu.surface_format(),
            )
        });

        if self.pipeline.is_none() {
            match FractalPipeline::create(backend) {
                Ok(pipeline) => self.pipeline = Some(pipeline),
                Err(err) => {
                    log::error!("failed to build fractal pipeline: {err}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(pipeline) = self.pipeline.as_ref() else {
            return AppControl::Continue;
        };

        ctx.render(wgpu::Color::BLACK, |rctx, target| {
            let (width, height) = rctx.pixel_size();
            pipeline.submit(backend, width, height);
            backend.encode(target);
        })
    }

    fn on_shutdown(&mut self) {
        let (Some(backend), Some(pipeline)) = (self.backend.as_mut(), self.pipeline.take()) else {
            return;
        };
        pipeline.destroy(backend);
        log::info!("viewer shut down ({} GPU objects live)", backend.live_objects());
    }
}
