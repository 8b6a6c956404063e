// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A surface shared between threads.
//!
//! [`Viewport`] pairs a [`LayoutTree`] with the compositor and the frame it
//! paints. Three locks are involved, always taken in this order:
//!
//! 1. the **update lock**, held for a whole [`update`](Viewport::update) so
//!    that ticks never overlap;
//! 2. the **layout lock** around the tree. Any thread mutates the tree
//!    through [`with_layout`](Viewport::with_layout); an update holds it only
//!    while draining, registering damage, and capturing the render plan;
//! 3. the **render lock** around the compositor, the surface factory and the
//!    frame. Painting holds it, so a slow paint never blocks tree mutation.

use std::time::Instant;

use kurbo::Size;
use parking_lot::Mutex;
use trellis_core::backend::{Surface, SurfaceFactory};
use trellis_core::config::RenderConfig;
use trellis_core::error::RenderError;
use trellis_core::scheduler::DrainReport;
use trellis_core::trace::{
    FrameSummary, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
    Tracer,
};
use trellis_core::tree::LayoutTree;

use crate::compositor::Compositor;
use crate::damage::FrameDamage;
use crate::plan::RenderPlan;

/// What one [`Viewport::update`] did.
#[derive(Clone, Debug)]
pub struct FrameReport {
    /// Frame counter.
    pub frame_index: u64,
    /// The layout drain.
    pub drain: DrainReport,
    /// What changed on the frame surface.
    pub damage: FrameDamage,
    /// Phase timings.
    pub summary: FrameSummary,
}

#[derive(Debug)]
struct RenderState<F> {
    compositor: Compositor,
    factory: F,
    frame: Option<Box<dyn Surface>>,
    damage: FrameDamage,
    repaint_all: bool,
}

/// A layout tree, its compositor and its frame surface behind locks.
#[derive(Debug)]
pub struct Viewport<F> {
    /// Frame counter; locking it is the update lock.
    update: Mutex<u64>,
    layout: Mutex<LayoutTree>,
    render: Mutex<RenderState<F>>,
    config: RenderConfig,
}

impl<F: SurfaceFactory> Viewport<F> {
    /// A viewport of `size` pixels painting through `factory`'s surfaces.
    pub fn new(size: Size, factory: F, config: RenderConfig) -> Self {
        Self {
            update: Mutex::new(0),
            layout: Mutex::new(LayoutTree::new(size)),
            render: Mutex::new(RenderState {
                compositor: Compositor::new(),
                factory,
                frame: None,
                damage: FrameDamage::Full,
                repaint_all: true,
            }),
            config,
        }
    }

    /// The configuration used for layout and painting.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Runs `f` with the layout lock held.
    pub fn with_layout<R>(&self, f: impl FnOnce(&mut LayoutTree) -> R) -> R {
        f(&mut self.layout.lock())
    }

    /// Runs `f` on the surface factory with the render lock held.
    pub fn with_factory<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        f(&mut self.render.lock().factory)
    }

    /// Resizes the surface. The frame is reallocated by the next update.
    pub fn resize(&self, size: Size) {
        self.layout.lock().resize(size);
    }

    /// Returns `true` while an update is running.
    pub fn is_updating(&self) -> bool {
        self.update.is_locked()
    }

    /// Runs `f` on the last composed frame and its damage. Returns `None`
    /// before the first successful update.
    pub fn with_frame<R>(&self, f: impl FnOnce(&dyn Surface, &FrameDamage) -> R) -> Option<R> {
        let state = self.render.lock();
        let frame = state.frame.as_deref()?;
        Some(f(frame, &state.damage))
    }

    /// Lays out and paints one frame.
    ///
    /// Returns `None` without waiting when another update is running.
    pub fn update(&self) -> Option<Result<FrameReport, RenderError>> {
        self.run(&mut Tracer::none())
    }

    /// Like [`update`](Self::update), reporting to `sink`.
    pub fn update_traced(
        &self,
        sink: &mut dyn TraceSink,
    ) -> Option<Result<FrameReport, RenderError>> {
        self.run(&mut Tracer::new(sink))
    }

    fn run(&self, tracer: &mut Tracer<'_>) -> Option<Result<FrameReport, RenderError>> {
        let mut frames = self.update.try_lock()?;
        let frame_index = *frames;
        *frames += 1;
        let mut phases = Phases {
            frame_index,
            summary: FrameSummaryBuilder::new(frame_index),
        };

        let (mut plan, drain) = {
            let mut tree = self.layout.lock();
            phases.begin(PhaseKind::Layout, tracer);
            let drain = tree.drain_with(&self.config, tracer);
            phases.end(PhaseKind::Layout, tracer);
            phases.begin(PhaseKind::Clipping, tracer);
            tree.process_clipping_with(tracer);
            phases.end(PhaseKind::Clipping, tracer);
            (RenderPlan::capture(&mut tree, &self.config), drain)
        };
        phases.summary.set_drain(drain.summary());
        if !drain.is_settled() {
            log::debug!(
                "painting frame {frame_index} with {} layout items left",
                drain.remaining
            );
        }

        let mut render = self.render.lock();
        let RenderState {
            compositor,
            factory,
            frame,
            damage,
            repaint_all,
        } = &mut *render;

        let size = plan.bounds().size();
        let surface = match frame {
            Some(surface) if surface.size() == size => surface,
            slot => match factory.create_surface(size) {
                Ok(surface) => {
                    *repaint_all = true;
                    slot.insert(surface)
                }
                Err(e) => {
                    log::error!("cannot allocate the {size:?} frame: {e}");
                    compositor.invalidate(&plan);
                    *repaint_all = true;
                    return Some(Err(e));
                }
            },
        };
        if *repaint_all {
            plan.force_full();
        }

        phases.begin(PhaseKind::Paint, tracer);
        let result = {
            let mut ctx = surface.context();
            compositor.paint(&plan, &mut *ctx, factory, &self.config, tracer)
        };
        phases.end(PhaseKind::Paint, tracer);

        match result {
            Ok(frame_damage) => {
                *repaint_all = false;
                let rects = frame_damage.rects(plan.bounds()).len();
                phases
                    .summary
                    .set_damage_rects(u32::try_from(rects).unwrap_or(u32::MAX));
                damage.clone_from(&frame_damage);
                let summary = phases.summary.finish();
                tracer.frame_summary(&summary);
                Some(Ok(FrameReport {
                    frame_index,
                    drain,
                    damage: frame_damage,
                    summary,
                }))
            }
            Err(e) => {
                log::error!("frame {frame_index} failed to paint: {e}");
                *repaint_all = true;
                Some(Err(e))
            }
        }
    }
}

/// Phase bookkeeping for one update.
struct Phases {
    frame_index: u64,
    summary: FrameSummaryBuilder,
}

impl Phases {
    fn begin(&mut self, phase: PhaseKind, tracer: &mut Tracer<'_>) {
        let timestamp = Instant::now();
        self.summary.phase_begin(phase, timestamp);
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }

    fn end(&mut self, phase: PhaseKind, tracer: &mut Tracer<'_>) {
        let timestamp = Instant::now();
        self.summary.phase_end(phase, timestamp);
        tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, mpsc};
    use std::thread;

    use trellis_core::backend::Color;
    use trellis_core::measure::{Alignment, Axis, Measure};
    use trellis_core::node::NodeId;
    use trellis_core::widget::Panel;

    use super::*;
    use crate::raster::{Bitmap, BitmapFactory};

    const COLORS: [Color; 4] = [
        Color::rgb8(200, 30, 30),
        Color::rgb8(30, 200, 30),
        Color::rgb8(30, 30, 200),
        Color::rgb8(200, 200, 30),
    ];

    fn viewport() -> Viewport<BitmapFactory> {
        Viewport::new(
            Size::new(100.0, 100.0),
            BitmapFactory::new(),
            RenderConfig::default(),
        )
    }

    /// One panel per colour, in rows 20 px apart.
    fn rows(vp: &Viewport<BitmapFactory>, width: f64) -> Vec<NodeId> {
        vp.with_layout(|t| {
            let root = t.root();
            COLORS
                .iter()
                .zip(0_u8..)
                .map(|(&color, row)| {
                    let n = t.create_node(Panel::new(color));
                    t.set_width(n, Measure::Fixed(width));
                    t.set_height(n, Measure::Fixed(10.0));
                    t.set_alignment(n, Axis::Horizontal, Alignment::Start);
                    t.set_alignment(n, Axis::Vertical, Alignment::Start);
                    t.set_offset(n, Axis::Vertical, 20.0 * f64::from(row) + 5.0);
                    t.add_child(root, n).unwrap();
                    n
                })
                .collect()
        })
    }

    fn snapshot(vp: &Viewport<BitmapFactory>) -> Bitmap {
        vp.with_frame(|surface, _| surface.as_any().downcast_ref::<Bitmap>().cloned())
            .flatten()
            .unwrap()
    }

    #[test]
    fn first_update_paints_everything() {
        let vp = viewport();
        assert!(vp.with_frame(|_, _| ()).is_none());
        rows(&vp, 30.0);
        let report = vp.update().unwrap().unwrap();
        assert!(report.drain.is_settled());
        assert!(report.damage.is_full());
        let frame = snapshot(&vp);
        assert_eq!(frame.pixel(0, 5), Some(COLORS[0]));
        assert_eq!(frame.pixel(29, 65), Some(COLORS[3]));
        assert_eq!(frame.pixel(30, 65), Some(Color::TRANSPARENT));

        let idle = vp.update().unwrap().unwrap();
        assert_eq!(idle.frame_index, 1);
        assert!(idle.damage.is_empty());
    }

    #[test]
    fn resize_reallocates_the_frame() {
        let vp = viewport();
        rows(&vp, 30.0);
        vp.update().unwrap().unwrap();
        vp.resize(Size::new(160.0, 90.0));
        let report = vp.update().unwrap().unwrap();
        assert!(report.damage.is_full());
        let size = vp.with_frame(|surface, _| surface.size());
        assert_eq!(size, Some(Size::new(160.0, 90.0)));
    }

    #[test]
    fn failed_paint_repaints_everything_next_time() {
        let vp = viewport();
        let nodes = rows(&vp, 30.0);
        vp.with_layout(|t| t.set_cache_enabled(nodes[0], true));
        vp.update().unwrap().unwrap();

        vp.with_layout(|t| t.set_widget(nodes[0], Panel::new(COLORS[2])))
            .unwrap();
        vp.with_factory(|f| f.set_limit(Some(10)));
        assert!(vp.update().unwrap().is_err());

        vp.with_factory(|f| f.set_limit(None));
        let report = vp.update().unwrap().unwrap();
        assert!(report.damage.is_full());
        assert_eq!(snapshot(&vp).pixel(0, 5), Some(COLORS[2]));
    }

    #[test]
    fn failed_frame_allocation_regenerates_caches() {
        let vp = viewport();
        let nodes = rows(&vp, 30.0);
        vp.with_layout(|t| t.set_cache_enabled(nodes[0], true));
        vp.update().unwrap().unwrap();

        vp.with_layout(|t| t.set_widget(nodes[0], Panel::new(COLORS[2])))
            .unwrap();
        vp.resize(Size::new(200.0, 200.0));
        // Room for the cache but not for the frame.
        vp.with_factory(|f| f.set_limit(Some(1000)));
        assert!(vp.update().unwrap().is_err());

        vp.with_factory(|f| f.set_limit(None));
        let report = vp.update().unwrap().unwrap();
        assert!(report.damage.is_full());
        assert_eq!(snapshot(&vp).pixel(1, 6), Some(COLORS[2]));
    }

    #[test]
    fn concurrent_update_returns_at_once() {
        let vp = Arc::new(viewport());
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let vp = Arc::clone(&vp);
            thread::spawn(move || {
                vp.with_layout(|_| {
                    locked_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };
        locked_rx.recv().unwrap();
        // This update takes the update lock, then waits for the layout lock.
        let updater = {
            let vp = Arc::clone(&vp);
            thread::spawn(move || vp.update().is_some())
        };
        while !vp.is_updating() {
            thread::yield_now();
        }
        assert!(vp.update().is_none());

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert!(updater.join().unwrap());
    }

    #[test]
    fn workers_mutate_while_main_thread_updates() {
        let vp = Arc::new(viewport());
        let nodes = rows(&vp, 10.0);

        let workers: Vec<_> = nodes
            .iter()
            .map(|&node| {
                let vp = Arc::clone(&vp);
                thread::spawn(move || {
                    for i in 0_u8..50 {
                        let w = 10.0 + f64::from(i % 5) * 5.0;
                        vp.with_layout(|t| t.set_width(node, Measure::Fixed(w)));
                    }
                })
            })
            .collect();
        while workers.iter().any(|w| !w.is_finished()) {
            if let Some(result) = vp.update() {
                result.unwrap();
            }
        }
        for w in workers {
            w.join().unwrap();
        }
        assert!(vp.update().unwrap().unwrap().drain.is_settled());

        // Every worker ended on i = 49, a width of 30.
        let reference = viewport();
        rows(&reference, 30.0);
        reference.update().unwrap().unwrap();
        assert_eq!(snapshot(&vp), snapshot(&reference));
    }
}
