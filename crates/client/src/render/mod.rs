// Canvas rendering - map image, player / bomb markers, annotations, bomb timer, overlays
pub mod scene;

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use scene::{
    colors, ActiveScene, Annotation, AnnotationKind, BombMarker, BombTimerLayout, Marker,
    PlayerMarker, Scene, SceneState,
};

/// Half-angle of the heading arrow, degrees.
const ARROW_SPREAD: f64 = 35.0;
/// Length of the scope line drawn from the arrow tip.
const SIGHT_LINE: f64 = 1024.0;
const HEALTH_BAR_WIDTH: f64 = 40.0;
const HEALTH_BAR_HEIGHT: f64 = 5.0;

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or("Failed to get 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;

        Ok(Self { canvas, ctx })
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.canvas.width() as f32
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.canvas.height() as f32
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    #[inline]
    pub fn clear(&self, background: &str) {
        self.ctx.set_fill_style_str(background);
        self.ctx.fill_rect(0.0, 0.0, self.width() as f64, self.height() as f64);
    }

    /// Draw one frame. `image` is the radar image of the active map, if loaded.
    pub fn draw(&self, scene: &Scene, image: Option<&HtmlImageElement>) -> Result<(), JsValue> {
        self.clear(colors::BACKGROUND);

        match &scene.state {
            SceneState::NoData { message } => self.draw_status(message)?,
            SceneState::Loading => {}
            SceneState::Active(active) => {
                if let Some(image) = image {
                    self.draw_map(active, image)?;
                }
                for marker in &active.markers {
                    match marker {
                        Marker::Player(player) => self.draw_player(player)?,
                        Marker::Bomb(bomb) => self.draw_bomb(bomb)?,
                    }
                }
                if let Some(timer) = &active.bomb_timer {
                    self.draw_bomb_timer(timer)?;
                }
            }
        }

        if let Some(stats) = &scene.stats {
            self.ctx.set_font("16px Arial");
            self.ctx.set_text_align("left");
            self.ctx.set_text_baseline("alphabetic");
            self.ctx.set_fill_style_str(colors::STATS);
            self.ctx.fill_text(stats, 10.0, 20.0)?;
        }
        Ok(())
    }

    fn draw_status(&self, message: &str) -> Result<(), JsValue> {
        self.ctx.set_font("40px Arial");
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(colors::TEXT);
        self.ctx
            .fill_text(message, self.width() as f64 / 2.0, self.height() as f64 / 2.0)
    }

    fn draw_map(&self, active: &ActiveScene, image: &HtmlImageElement) -> Result<(), JsValue> {
        let (w, h) = (self.width() as f64, self.height() as f64);
        self.ctx.save();
        if let Some(angle) = active.rotation {
            self.ctx.translate(w / 2.0, h / 2.0)?;
            self.ctx.rotate((angle as f64).to_radians())?;
            self.ctx.translate(-w / 2.0, -h / 2.0)?;
        }
        let src = active.source;
        let result = self
            .ctx
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                src.min.x as f64,
                src.min.y as f64,
                src.size.x as f64,
                src.size.y as f64,
                0.0,
                0.0,
                w,
                h,
            );
        self.ctx.restore();
        result
    }

    fn circle(&self, pos: Vec2, radius: f64) -> Result<(), JsValue> {
        self.ctx.begin_path();
        self.ctx.arc(pos.x as f64, pos.y as f64, radius.max(0.0), 0.0, TAU)
    }

    fn draw_player(&self, marker: &PlayerMarker) -> Result<(), JsValue> {
        let (x, y) = (marker.pos.x as f64, marker.pos.y as f64);

        if marker.dormant {
            self.ctx.set_font("20px Arial");
            self.ctx.set_text_align("center");
            self.ctx.set_text_baseline("alphabetic");
            self.ctx.set_fill_style_str(marker.color);
            return self.ctx.fill_text("?", x, y);
        }

        let mut radius = marker.radius as f64;
        let distance = radius + 2.0;
        let tip = distance + 5.0;

        if marker.focused {
            self.circle(marker.pos, radius + 4.0)?;
            self.ctx.set_fill_style_str(colors::FOCUS_RING);
            self.ctx.fill();
        }
        if marker.has_awp {
            self.circle(marker.pos, radius)?;
            self.ctx.set_fill_style_str(colors::AWP);
            self.ctx.fill();
            radius -= 2.0;
        }
        self.circle(marker.pos, radius)?;
        self.ctx.set_fill_style_str(marker.color);
        self.ctx.fill();

        // Heading is counter-clockwise with y up; canvas angles run clockwise with y down.
        let heading = marker.heading as f64;
        let point = |deg: f64, len: f64| {
            let rad = deg.to_radians();
            (x + len * rad.cos(), y - len * rad.sin())
        };
        let (head_x, head_y) = point(heading, tip);
        let (c1_x, c1_y) = point(heading - ARROW_SPREAD, distance);
        let (c2_x, c2_y) = point(heading + ARROW_SPREAD, distance);
        let arc_center = 90.0 - heading;

        self.ctx.begin_path();
        self.ctx.arc(
            x,
            y,
            distance,
            (arc_center - ARROW_SPREAD).to_radians() - FRAC_PI_2,
            (arc_center + ARROW_SPREAD).to_radians() - FRAC_PI_2,
        )?;
        self.ctx.line_to(c1_x, c1_y);
        self.ctx.line_to(head_x, head_y);
        self.ctx.line_to(c2_x, c2_y);
        self.ctx.close_path();
        self.ctx.set_fill_style_str("white");
        self.ctx.fill();

        if marker.scoped {
            let (end_x, end_y) = point(heading, tip + SIGHT_LINE);
            self.ctx.begin_path();
            self.ctx.move_to(head_x, head_y);
            self.ctx.line_to(end_x, end_y);
            self.ctx.set_stroke_style_str(marker.color);
            self.ctx.set_line_width(1.0);
            self.ctx.stroke();
        }

        for annotation in &marker.annotations {
            self.draw_annotation(marker.pos, annotation)?;
        }
        Ok(())
    }

    fn outlined_text(&self, text: &str, color: &str, x: f64, y: f64) -> Result<(), JsValue> {
        self.ctx.set_line_width(2.0);
        self.ctx.set_stroke_style_str("black");
        self.ctx.stroke_text(text, x, y)?;
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_text(text, x, y)
    }

    fn draw_annotation(&self, anchor: Vec2, annotation: &Annotation) -> Result<(), JsValue> {
        let x = anchor.x as f64;
        let y = (anchor.y + annotation.offset_y) as f64;

        self.ctx.set_font(&format!("{}px Arial", annotation.font_size));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("top");

        match &annotation.kind {
            AnnotationKind::Text { text, color } => self.outlined_text(text, color, x, y),
            AnnotationKind::Health { value, color } => {
                let left = x - HEALTH_BAR_WIDTH / 2.0;
                self.ctx.set_fill_style_str(colors::BAR_TRACK);
                self.ctx.fill_rect(left, y, HEALTH_BAR_WIDTH, HEALTH_BAR_HEIGHT);
                let filled = (*value).min(100) as f64 / 100.0 * HEALTH_BAR_WIDTH;
                self.ctx.set_fill_style_str(color);
                self.ctx.fill_rect(left, y, filled, HEALTH_BAR_HEIGHT);
                self.outlined_text(&format!("{value}HP"), color, x, y + HEALTH_BAR_HEIGHT + 1.0)
            }
        }
    }

    fn draw_bomb(&self, marker: &BombMarker) -> Result<(), JsValue> {
        let radius = marker.radius as f64;
        self.circle(marker.pos, radius)?;
        self.ctx.set_fill_style_str(colors::BOMB);
        self.ctx.fill();
        self.ctx.set_line_width(2.0);
        self.ctx.set_stroke_style_str("black");
        self.ctx.stroke();

        self.ctx.set_font(&format!("{}px Arial", radius * 1.2));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str("white");
        self.ctx.fill_text("C4", marker.pos.x as f64, marker.pos.y as f64)?;

        if marker.planted && marker.blink {
            self.circle(marker.pos, radius + 4.0)?;
            self.ctx.set_stroke_style_str(colors::ENEMY);
            self.ctx.set_line_width(3.0);
            self.ctx.stroke();
        }
        Ok(())
    }

    fn draw_bomb_timer(&self, timer: &BombTimerLayout) -> Result<(), JsValue> {
        let (x, y, w, h) = (timer.x as f64, timer.y as f64, timer.width as f64, timer.height as f64);
        // Inner track, inset by the 2 px frame
        let at = |ratio: f32| x + 2.0 + (w - 2.0) * ratio as f64;

        self.ctx.set_fill_style_str("black");
        self.ctx.fill_rect(x, y, w, h);
        self.ctx.set_fill_style_str(timer.fill_color);
        self.ctx
            .fill_rect(x + 2.0, y + 2.0, (w - 2.0) * timer.fill_ratio as f64, h - 4.0);

        self.ctx.set_font("24px Arial");
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(colors::TEXT);
        self.ctx
            .fill_text(&timer.label, self.width() as f64 / 2.0, y + h + 20.0)?;

        self.ctx.set_line_width(2.0);
        self.ctx.set_stroke_style_str("black");
        for tick in timer.ticks {
            self.vertical_line(at(tick), y, h);
        }
        if let Some(defuse) = timer.defuse_marker {
            self.ctx.set_stroke_style_str("green");
            self.vertical_line(at(defuse), y, h);
        }
        Ok(())
    }

    fn vertical_line(&self, x: f64, y: f64, h: f64) {
        self.ctx.begin_path();
        self.ctx.move_to(x, y);
        self.ctx.line_to(x, y + h);
        self.ctx.stroke();
    }
}
