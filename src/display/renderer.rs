//! Lays a [`DepthFrame`] out on a fixed character grid.
//!
//! Grid layout, `h` rows tall:
//!
//! ```text
//! row 0        input prompt (when active)
//! row 1             Ask  <ask total>  group N
//! rows 2..h/2  asks, best price nearest the midline
//! row h/2      <ltp>  <spread>  <health>
//! rows h/2+1.. bids, best price nearest the midline
//! row h-1           Bid  <bid total>
//! ```
//!
//! Rendering only writes cells of the buffer it is handed.

use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};
use ratatui::buffer::Buffer;
use ratatui::style::{Color, Style};

use crate::aggregator::{Bucket, SideStats};
use crate::display::frame::DepthFrame;
use crate::models::{Price, Quantity, Side};
use crate::utils::to_f64;

pub const PRICE_X: u16 = 1;
pub const SIZE_X: u16 = PRICE_X + 9;
pub const BAR_X: u16 = SIZE_X + 11;
pub const MAX_BAR: usize = 30;
const BAR_GLYPH: &str = "-";
const HEALTH_WIDTH: usize = 10;

/// Smallest grid the layout fits in: one row per side plus labels and the
/// midline, and room for the health column.
pub const MIN_WIDTH: u16 = BAR_X + HEALTH_WIDTH as u16;
pub const MIN_HEIGHT: u16 = 6;

const PAUSE_WIDTH: u16 = 13;

const TEXT: Style = Style::new().fg(Color::White);
const LTP_TEXT: Style = Style::new().fg(Color::Yellow);
const HIGHLIGHT: Style = Style::new().fg(Color::Blue).bg(Color::Yellow);
const PAUSE: Style = Style::new().fg(Color::White).bg(Color::Red);

fn fmt_price(price: &Price) -> String {
    format!("{:8.0}", to_f64(price))
}

fn fmt_size(size: &Quantity) -> String {
    format!("{:8.2}", to_f64(size))
}

/// Writes `text` at grid coordinates, clipped to the buffer.
fn put(buf: &mut Buffer, x: u16, y: u16, text: &str, style: Style) {
    let area = buf.area;
    if x >= area.width || y >= area.height {
        return;
    }
    let room = usize::from(area.width - x);
    buf.set_stringn(area.x + x, area.y + y, text, room, style);
}

/// `floor(quantity / (max / MAX_BAR))`, capped at `MAX_BAR`.
pub fn bar_length(quantity: &Quantity, max: &Quantity) -> usize {
    if max.is_zero() {
        return 0;
    }
    let scaled = quantity * BigDecimal::from(MAX_BAR as u32) / max;
    scaled
        .with_scale(0)
        .to_usize()
        .unwrap_or(0)
        .min(MAX_BAR)
}

/// The bucket holds the last traded price: Ltp equals its label or lies in
/// `[lower, upper)`, where an ask label is the upper bound and a bid label
/// the lower bound.
fn holds_ltp(bucket: &Bucket, ltp: Option<&Price>, side: Side, group: u32) -> bool {
    let Some(ltp) = ltp else {
        return false;
    };
    if *ltp == bucket.price {
        return true;
    }
    let unit = BigDecimal::from(group);
    let (lower, upper) = match side {
        Side::Ask => (&bucket.price - &unit, bucket.price.clone()),
        Side::Bid => (bucket.price.clone(), &bucket.price + &unit),
    };
    lower <= *ltp && *ltp < upper
}

/// The side's VWAP lies strictly inside `(price - group, price)`.
fn holds_vwap(bucket: &Bucket, stats: &SideStats, group: u32) -> bool {
    match &stats.vwap {
        Some(vwap) => {
            let lower = &bucket.price - BigDecimal::from(group);
            *vwap > lower && *vwap < bucket.price
        }
        None => false,
    }
}

fn price_style(bucket: &Bucket, frame: &DepthFrame, side: Side) -> Style {
    let (stats, accent) = match side {
        Side::Ask => (&frame.ask_stats, Color::Red),
        Side::Bid => (&frame.bid_stats, Color::Green),
    };
    let mut style = if holds_ltp(bucket, frame.ltp.as_ref(), side, frame.group) {
        HIGHLIGHT
    } else {
        TEXT
    };
    if holds_vwap(bucket, stats, frame.group) {
        style = style.fg(accent);
    }
    style
}

fn draw_row(buf: &mut Buffer, y: u16, bucket: &Bucket, frame: &DepthFrame, side: Side) {
    put(buf, PRICE_X, y, &fmt_price(&bucket.price), price_style(bucket, frame, side));
    put(buf, SIZE_X, y, &fmt_size(&bucket.quantity), TEXT);
    let bar = BAR_GLYPH.repeat(bar_length(&bucket.quantity, frame.max_shown()));
    put(buf, BAR_X, y, &bar, TEXT);
}

/// Draws the depth chart. Grids smaller than [`MIN_WIDTH`] x [`MIN_HEIGHT`]
/// are left untouched.
pub fn render(buf: &mut Buffer, frame: &DepthFrame) {
    let (width, height) = (buf.area.width, buf.area.height);
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return;
    }
    let mid = height / 2;

    put(buf, PRICE_X, 1, &format!("{:>8}", "Ask"), TEXT);
    put(buf, SIZE_X, 1, &fmt_size(&frame.totals.ask), TEXT);
    put(buf, BAR_X, 1, &format!("group {}", frame.group), TEXT);
    put(buf, PRICE_X, height - 1, &format!("{:>8}", "Bid"), TEXT);
    put(buf, SIZE_X, height - 1, &fmt_size(&frame.totals.bid), TEXT);

    match &frame.ltp {
        Some(ltp) => put(buf, PRICE_X, mid, &fmt_price(ltp), LTP_TEXT),
        None => put(buf, PRICE_X, mid, &format!("{:>8}", "-"), LTP_TEXT),
    }
    if let Some(spread) = &frame.spread {
        put(buf, SIZE_X, mid, &fmt_price(spread), TEXT);
    }
    let health_color = if frame.health.is_normal() {
        Color::Green
    } else {
        Color::Red
    };
    put(
        buf,
        BAR_X,
        mid,
        &format!("{:<width$}", frame.health.as_str(), width = HEALTH_WIDTH),
        Style::new().fg(health_color),
    );

    // Asks grow upward from the midline, bids downward.
    for (i, bucket) in frame.asks.iter().enumerate() {
        let Some(y) = (mid - 1).checked_sub(i as u16) else {
            break;
        };
        if y < 2 {
            break;
        }
        draw_row(buf, y, bucket, frame, Side::Ask);
    }
    for (i, bucket) in frame.bids.iter().enumerate() {
        let y = mid + 1 + i as u16;
        if y > height - 2 {
            break;
        }
        draw_row(buf, y, bucket, frame, Side::Bid);
    }
}

/// Red `Pause` banner centred on the grid. Reads nothing but the buffer size.
pub fn render_paused(buf: &mut Buffer) {
    let (width, height) = (buf.area.width, buf.area.height);
    if height < 3 {
        return;
    }
    let x = (width / 2).saturating_sub(6);
    let y = height / 2;
    let blank = " ".repeat(usize::from(PAUSE_WIDTH));
    put(buf, x, y - 1, &blank, PAUSE);
    put(buf, x, y, "    Pause    ", PAUSE);
    put(buf, x, y + 1, &blank, PAUSE);
}

/// Group-entry prompt on the top row.
pub fn render_prompt(buf: &mut Buffer, digits: &str) {
    put(buf, PRICE_X, 0, &format!("group: {digits}_"), LTP_TEXT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::summarize;
    use crate::models::{Health, SideTotals};
    use ratatui::layout::Rect;
    use std::str::FromStr;

    fn d(v: &str) -> BigDecimal {
        BigDecimal::from_str(v).unwrap()
    }

    fn buckets(pairs: &[(&str, &str)]) -> Vec<Bucket> {
        pairs.iter().map(|(p, q)| Bucket::new(d(p), d(q))).collect()
    }

    fn frame(asks: &[(&str, &str)], bids: &[(&str, &str)], group: u32) -> DepthFrame {
        let asks = buckets(asks);
        let bids = buckets(bids);
        DepthFrame {
            ask_stats: summarize(&asks, asks.len()),
            bid_stats: summarize(&bids, bids.len()),
            asks,
            bids,
            ltp: None,
            spread: Some(d("1")),
            health: Health::normal(),
            totals: SideTotals {
                bid: d("12.5"),
                ask: d("30"),
            },
            group,
        }
    }

    fn grid(width: u16, height: u16) -> Buffer {
        Buffer::empty(Rect::new(0, 0, width, height))
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    fn text_at(buf: &Buffer, x: u16, y: u16, len: u16) -> String {
        (x..x + len).map(|x| buf[(x, y)].symbol()).collect()
    }

    #[test]
    fn lays_out_labels_midline_and_ladders() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("100", "1"), ("101", "2")], &[("99", "3"), ("98", "4")], 1);
        f.ltp = Some(d("100"));
        render(&mut buf, &f);

        assert_eq!(text_at(&buf, PRICE_X, 1, 8), "     Ask");
        assert_eq!(text_at(&buf, SIZE_X, 1, 8), "   30.00");
        assert_eq!(text_at(&buf, PRICE_X, 11, 8), "     Bid");
        assert_eq!(text_at(&buf, SIZE_X, 11, 8), "   12.50");

        // Midline: ltp, spread, health.
        assert_eq!(text_at(&buf, PRICE_X, 6, 8), "     100");
        assert_eq!(buf[(PRICE_X + 7, 6)].fg, Color::Yellow);
        assert_eq!(text_at(&buf, SIZE_X, 6, 8), "       1");
        assert_eq!(text_at(&buf, BAR_X, 6, 6), "NORMAL");
        assert_eq!(buf[(BAR_X, 6)].fg, Color::Green);

        // Best ask directly above the midline, best bid directly below.
        assert_eq!(text_at(&buf, PRICE_X, 5, 8), "     100");
        assert_eq!(text_at(&buf, PRICE_X, 4, 8), "     101");
        assert_eq!(text_at(&buf, SIZE_X, 4, 8), "    2.00");
        assert_eq!(text_at(&buf, PRICE_X, 7, 8), "      99");
        assert_eq!(text_at(&buf, PRICE_X, 8, 8), "      98");
        assert_eq!(text_at(&buf, SIZE_X, 8, 8), "    4.00");
    }

    #[test]
    fn bars_scale_to_largest_shown_bucket() {
        let mut buf = grid(60, 12);
        let f = frame(&[("100", "1"), ("101", "2")], &[("99", "4")], 1);
        render(&mut buf, &f);

        let bar = |y: u16| row_text(&buf, y)[usize::from(BAR_X)..].trim_end().to_string();
        assert_eq!(bar(5), "-".repeat(7));
        assert_eq!(bar(4), "-".repeat(15));
        assert_eq!(bar(7), "-".repeat(30));
    }

    #[test]
    fn bar_length_is_capped_and_floored() {
        assert_eq!(bar_length(&d("10"), &d("10")), MAX_BAR);
        assert_eq!(bar_length(&d("20"), &d("10")), MAX_BAR);
        assert_eq!(bar_length(&d("1"), &d("3")), 10);
        assert_eq!(bar_length(&d("0.09"), &d("1")), 2);
        assert_eq!(bar_length(&d("1"), &d("0")), 0);
    }

    #[test]
    fn highlights_bucket_containing_ltp() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("105", "1"), ("110", "1")], &[("100", "1"), ("95", "1")], 5);
        f.ltp = Some(d("107"));
        render(&mut buf, &f);

        // 107 belongs to the ask bucket [105, 110).
        assert_eq!(buf[(PRICE_X + 7, 4)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 5)].bg, Color::Reset);

        f.ltp = Some(d("97"));
        let mut buf = grid(60, 12);
        render(&mut buf, &f);
        // 97 belongs to the bid bucket [95, 100).
        assert_eq!(buf[(PRICE_X + 7, 8)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 7)].bg, Color::Reset);
        assert_eq!(buf[(PRICE_X + 7, 4)].bg, Color::Reset);
    }

    #[test]
    fn accents_bucket_straddling_vwap() {
        let mut buf = grid(60, 12);
        // Ask VWAP = (105*1 + 110*3) / 4 = 108.75, inside (105, 110).
        // Bid VWAP = (100*1 + 95*1) / 2 = 97.5, inside (95, 100).
        let f = frame(&[("105", "1"), ("110", "3")], &[("100", "1"), ("95", "1")], 5);
        render(&mut buf, &f);

        assert_eq!(buf[(PRICE_X + 7, 4)].fg, Color::Red);
        assert_eq!(buf[(PRICE_X + 7, 5)].fg, Color::White);
        assert_eq!(buf[(PRICE_X + 7, 7)].fg, Color::Green);
        assert_eq!(buf[(PRICE_X + 7, 8)].fg, Color::White);
    }

    #[test]
    fn ltp_on_a_multiple_highlights_the_ask_bucket_above() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("105", "1"), ("110", "1")], &[("100", "1")], 5);
        f.ltp = Some(d("105"));
        render(&mut buf, &f);

        // 105 is the label of the first ask bucket and lies in [105, 110).
        assert_eq!(buf[(PRICE_X + 7, 5)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 4)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 7)].bg, Color::Reset);
    }

    #[test]
    fn fractional_ltp_highlights_both_neighbours_without_grouping() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("101", "1"), ("102", "1")], &[("100", "1"), ("99", "1")], 1);
        f.ltp = Some(d("100.5"));
        render(&mut buf, &f);

        // Ask 101 covers [100, 101), bid 100 covers [100, 101).
        assert_eq!(buf[(PRICE_X + 7, 5)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 7)].bg, Color::Yellow);
        assert_eq!(buf[(PRICE_X + 7, 4)].bg, Color::Reset);
        assert_eq!(buf[(PRICE_X + 7, 8)].bg, Color::Reset);
    }

    #[test]
    fn exact_ltp_match_is_blue_on_yellow() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("100", "1"), ("105", "1")], &[("99", "1")], 1);
        f.ltp = Some(d("105"));
        render(&mut buf, &f);
        let cell = &buf[(PRICE_X + 7, 4)];
        assert_eq!((cell.fg, cell.bg), (Color::Blue, Color::Yellow));
    }

    #[test]
    fn unhealthy_status_is_red() {
        let mut buf = grid(60, 12);
        let mut f = frame(&[("100", "1")], &[("99", "1")], 1);
        f.health = Health::new("SUPER BUSY");
        render(&mut buf, &f);
        assert_eq!(text_at(&buf, BAR_X, 6, 10), "SUPER BUSY");
        assert_eq!(buf[(BAR_X, 6)].fg, Color::Red);
    }

    #[test]
    fn overflow_keeps_rows_nearest_the_midline() {
        // Height 8: midline 4, asks on rows 3..=2, bids on rows 5..=6.
        let mut buf = grid(60, 8);
        let f = frame(
            &[("100", "1"), ("101", "1"), ("102", "1"), ("103", "1")],
            &[("99", "1"), ("98", "1"), ("97", "1"), ("96", "1")],
            1,
        );
        render(&mut buf, &f);

        assert_eq!(text_at(&buf, PRICE_X, 3, 8), "     100");
        assert_eq!(text_at(&buf, PRICE_X, 2, 8), "     101");
        assert_eq!(text_at(&buf, PRICE_X, 1, 8), "     Ask");
        assert_eq!(text_at(&buf, PRICE_X, 5, 8), "      99");
        assert_eq!(text_at(&buf, PRICE_X, 6, 8), "      98");
        assert_eq!(text_at(&buf, PRICE_X, 7, 8), "     Bid");
        assert!(!(0..8).any(|y| row_text(&buf, y).contains("102")));
    }

    #[test]
    fn tiny_grid_is_left_blank() {
        let mut buf = grid(20, 4);
        render(&mut buf, &frame(&[("100", "1")], &[("99", "1")], 1));
        assert_eq!(buf, grid(20, 4));
    }

    #[test]
    fn pause_banner_is_centred() {
        let mut buf = grid(40, 10);
        render_paused(&mut buf);
        assert_eq!(text_at(&buf, 14, 5, 13), "    Pause    ");
        for y in 4..=6 {
            assert_eq!(buf[(14, y)].bg, Color::Red);
            assert_eq!(buf[(26, y)].bg, Color::Red);
            assert_eq!(buf[(27, y)].bg, Color::Reset);
        }
    }

    #[test]
    fn prompt_shows_typed_digits() {
        let mut buf = grid(40, 10);
        render_prompt(&mut buf, "25");
        assert_eq!(text_at(&buf, PRICE_X, 0, 10), "group: 25_");
    }
}
