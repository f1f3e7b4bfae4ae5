use std::sync::Arc;

use kurbo::Point;

use crate::{
    data::{Cohort, Dataset},
    dispatch::View,
    error::{ScopeError, ScopeResult},
    props::{Field, HighlightSlots, Snapshot},
};

/// Opacity of non-highlighted cohort lines outside the trail window.
pub const BASE_ALPHA: f64 = 0.33;
/// Points within this many years behind the scrub position get a trail fade.
pub const TRAIL_WINDOW_YEARS: f64 = 6.0;
/// Divisor of the fade law `alpha = 1 - distance / TRAIL_FADE_SPAN_YEARS`.
pub const TRAIL_FADE_SPAN_YEARS: f64 = 9.0;

/// y = range_lo + (v - d0) / (d1 - d0) * (range_hi - range_lo), the linear
/// scale underneath both chart axes. Ranges may be inverted (screen y grows
/// downward).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> ScopeResult<Self> {
        if !(domain.0.is_finite() && domain.1.is_finite()) {
            return Err(ScopeError::validation("scale domain must be finite"));
        }
        if domain.0 == domain.1 {
            return Err(ScopeError::validation("scale domain is degenerate"));
        }
        Ok(Self { domain, range })
    }

    pub fn map(&self, v: f64) -> f64 {
        let t = (v - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// Pixel-space mapping for the chart body: age along x, income along y
/// (inverted, origin at the top-left like any canvas).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ChartGeometry {
    pub x: LinearScale,
    pub y: LinearScale,
    pub age_extent: (i32, i32),
}

impl ChartGeometry {
    pub fn new(dataset: &Dataset, width: f64, height: f64) -> ScopeResult<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(ScopeError::validation("chart size must be positive"));
        }
        let age_extent = dataset.age_extent();
        Ok(Self {
            x: LinearScale::new(
                (f64::from(age_extent.0), f64::from(age_extent.1)),
                (0.0, width),
            )?,
            y: LinearScale::new((0.0, dataset.income_max()), (height, 0.0))?,
            age_extent,
        })
    }
}

/// Drawing emphasis: the full cohort field vs a highlighted series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Emphasis {
    Base,
    Highlight,
}

/// A run of placed points sharing one opacity.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TraceSegment {
    pub points: Vec<Point>,
    pub alpha: f64,
}

/// The cohort's "current position" dot.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Marker {
    pub center: Point,
    pub alpha: f64,
}

/// Everything a renderer needs to draw one cohort at one scrub position.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CohortTrace {
    pub birth_year: i32,
    pub emphasis: Emphasis,
    pub segments: Vec<TraceSegment>,
    pub marker: Option<Marker>,
}

/// Places one cohort's polyline at a fractional year position.
///
/// Points observed at or before `floor(year)` sit at their exact historical
/// coordinates; the point one survey year ahead is pulled toward its final
/// position by the fractional remainder. Base-emphasis traces split into
/// fading segments over the trailing window; the current-position marker
/// fades in and out across the cohort's first and last observed age.
pub fn trace_cohort(
    cohort: &Cohort,
    year: f64,
    geometry: &ChartGeometry,
    emphasis: Emphasis,
) -> CohortTrace {
    let rem = year.fract();
    let line_alpha = match emphasis {
        Emphasis::Base => BASE_ALPHA,
        Emphasis::Highlight => 1.0,
    };

    let mut segments: Vec<TraceSegment> = Vec::new();
    let mut current = TraceSegment {
        points: Vec::new(),
        alpha: line_alpha,
    };
    let mut pos: Option<Point> = None;

    for (j, p) in cohort.points.iter().enumerate() {
        let point_year = f64::from(p.year);
        if point_year >= year + 1.0 {
            break;
        }

        let target = Point::new(geometry.x.map(f64::from(p.age)), geometry.y.map(p.income));
        let placed = if point_year <= year || j == 0 {
            target
        } else {
            // The frontier point: interpolated from the previous placed
            // position by the fractional remainder.
            let prev = pos.unwrap_or(target);
            Point::new(
                prev.x + (target.x - prev.x) * rem,
                prev.y + (target.y - prev.y) * rem,
            )
        };
        current.points.push(placed);
        pos = Some(placed);

        let distance = year - point_year;
        if emphasis == Emphasis::Base && distance < TRAIL_WINDOW_YEARS {
            // Close the run here and open a faded one from this point.
            let next_alpha = 1.0 - distance / TRAIL_FADE_SPAN_YEARS;
            let done = std::mem::replace(
                &mut current,
                TraceSegment {
                    points: vec![placed],
                    alpha: next_alpha,
                },
            );
            if done.points.len() > 1 {
                segments.push(done);
            }
        }
    }
    if current.points.len() > 1 {
        segments.push(current);
    }

    let birth = f64::from(cohort.birth_year);
    let delta_start = year - birth - f64::from(geometry.age_extent.0);
    let delta_end = year - birth - f64::from(geometry.age_extent.1);
    let marker = if delta_start > -1.0 && delta_end < 1.0 {
        pos.map(|center| Marker {
            center,
            alpha: if delta_start < 0.0 {
                rem
            } else if delta_end > 0.0 {
                1.0 - rem
            } else {
                1.0
            },
        })
    } else {
        None
    };

    CohortTrace {
        birth_year: cohort.birth_year,
        emphasis,
        segments,
        marker,
    }
}

/// All traces for one scrub position: the base field plus highlight overlays
/// in slot order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ChartFrame {
    pub year: f64,
    pub traces: Vec<CohortTrace>,
    pub highlights: Vec<CohortTrace>,
}

pub fn render_frame(
    dataset: &Dataset,
    geometry: &ChartGeometry,
    year: f64,
    slots: &HighlightSlots,
) -> ChartFrame {
    let traces = dataset
        .cohorts()
        .iter()
        .map(|c| trace_cohort(c, year, geometry, Emphasis::Base))
        .collect();

    let highlights = slots
        .iter()
        .flatten()
        .filter_map(|born| dataset.cohort(*born))
        .map(|c| trace_cohort(c, year, geometry, Emphasis::Highlight))
        .collect();

    ChartFrame {
        year,
        traces,
        highlights,
    }
}

/// The chart as a dispatcher view: recomputes its frame when the scrub
/// position or the highlight set moves.
pub struct ChartView {
    dataset: Arc<Dataset>,
    geometry: ChartGeometry,
    frame: Option<ChartFrame>,
}

impl ChartView {
    pub fn new(dataset: Arc<Dataset>, geometry: ChartGeometry) -> Self {
        Self {
            dataset,
            geometry,
            frame: None,
        }
    }

    /// The last computed frame, once any dispatch has reached this view.
    pub fn frame(&self) -> Option<&ChartFrame> {
        self.frame.as_ref()
    }
}

impl View for ChartView {
    fn name(&self) -> &'static str {
        "chart"
    }

    fn watched(&self) -> &'static [Field] {
        &[Field::Year, Field::HighlightedCohorts]
    }

    fn update(&mut self, snapshot: &Snapshot, _changed: &[Field]) -> ScopeResult<()> {
        self.frame = Some(render_frame(
            &self.dataset,
            &self.geometry,
            snapshot.year,
            &snapshot.highlighted_cohorts,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataPoint;

    fn dataset() -> Dataset {
        // One cohort born 1950 observed ages 24..=28, incomes rising 10k/yr,
        // plus a second cohort to keep extents honest.
        let mut rows = Vec::new();
        for (i, year) in (1974..=1978).enumerate() {
            rows.push(DataPoint {
                year,
                age: 24 + i as i32,
                income: 10_000.0 * (i as f64 + 1.0),
            });
        }
        rows.push(DataPoint {
            year: 1978,
            age: 24,
            income: 30_000.0,
        });
        Dataset::from_rows(rows).unwrap()
    }

    fn geometry(ds: &Dataset) -> ChartGeometry {
        // Identity-friendly: ages 24..28 -> x 0..4, incomes 0..50k -> y 50..0.
        ChartGeometry {
            x: LinearScale::new((24.0, 28.0), (0.0, 4.0)).unwrap(),
            y: LinearScale::new((0.0, 50_000.0), (50.0, 0.0)).unwrap(),
            age_extent: ds.age_extent(),
        }
    }

    #[test]
    fn linear_scale_maps_and_inverts() {
        let s = LinearScale::new((0.0, 10.0), (0.0, 100.0)).unwrap();
        assert_eq!(s.map(2.5), 25.0);
        let inv = LinearScale::new((0.0, 10.0), (100.0, 0.0)).unwrap();
        assert_eq!(inv.map(2.5), 75.0);
        assert!(LinearScale::new((3.0, 3.0), (0.0, 1.0)).is_err());
    }

    #[test]
    fn whole_year_places_points_exactly() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        let trace = trace_cohort(cohort, 1976.0, &geo, Emphasis::Highlight);
        let points: Vec<Point> = trace
            .segments
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        // Points up to 1976 exactly; 1977 excluded (1977 >= 1976 + 1).
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Point::new(0.0, 40.0));
        assert_eq!(points[1], Point::new(1.0, 30.0));
        assert_eq!(points[2], Point::new(2.0, 20.0));
    }

    #[test]
    fn fractional_year_interpolates_frontier_point() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        let trace = trace_cohort(cohort, 1976.5, &geo, Emphasis::Highlight);
        let points: Vec<Point> = trace
            .segments
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        assert_eq!(points.len(), 4);
        // The 1977 point is pulled halfway from the 1976 position toward its
        // own: x 2 -> 3, y 20 -> 10.
        let frontier = points[3];
        assert!((frontier.x - 2.5).abs() < 1e-9);
        assert!((frontier.y - 15.0).abs() < 1e-9);
    }

    #[test]
    fn base_trace_fades_over_trailing_window() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        let trace = trace_cohort(cohort, 1978.0, &geo, Emphasis::Base);
        // Every observed point is within 6 years of 1978, so each opens a
        // faded segment; five points make four two-point segments.
        assert_eq!(trace.segments.len(), 4);
        for (i, seg) in trace.segments.iter().enumerate() {
            let distance = 4.0 - i as f64; // distance of the segment's first point
            assert!((seg.alpha - (1.0 - distance / TRAIL_FADE_SPAN_YEARS)).abs() < 1e-9);
        }
    }

    #[test]
    fn highlight_trace_is_one_opaque_segment() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        let trace = trace_cohort(cohort, 1978.0, &geo, Emphasis::Highlight);
        assert_eq!(trace.segments.len(), 1);
        assert_eq!(trace.segments[0].alpha, 1.0);
        assert_eq!(trace.segments[0].points.len(), 5);
    }

    #[test]
    fn marker_fades_in_and_out_at_age_boundaries() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        // Not yet entered: year 1973.0 => delta_start = -1.
        assert!(
            trace_cohort(cohort, 1973.0, &geo, Emphasis::Base)
                .marker
                .is_none()
        );

        // Fading in: delta_start in (-1, 0) uses the fractional remainder.
        let t = trace_cohort(cohort, 1973.25, &geo, Emphasis::Base);
        let m = t.marker.unwrap();
        assert!((m.alpha - 0.25).abs() < 1e-9);

        // Fully inside the observed age range.
        let t = trace_cohort(cohort, 1976.0, &geo, Emphasis::Base);
        assert_eq!(t.marker.unwrap().alpha, 1.0);

        // Fading out past the last observed age.
        let t = trace_cohort(cohort, 1978.75, &geo, Emphasis::Base);
        let m = t.marker.unwrap();
        assert!((m.alpha - 0.25).abs() < 1e-9);

        // Gone: delta_end = 1.
        assert!(
            trace_cohort(cohort, 1979.0, &geo, Emphasis::Base)
                .marker
                .is_none()
        );
    }

    #[test]
    fn marker_rides_the_interpolated_frontier() {
        let ds = dataset();
        let geo = geometry(&ds);
        let cohort = ds.cohort(1950).unwrap();

        let t = trace_cohort(cohort, 1976.5, &geo, Emphasis::Highlight);
        let m = t.marker.unwrap();
        assert!((m.center.x - 2.5).abs() < 1e-9);
        assert!((m.center.y - 15.0).abs() < 1e-9);
    }

    #[test]
    fn render_frame_orders_highlights_by_slot() {
        let ds = dataset();
        let geo = geometry(&ds);
        let frame = render_frame(&ds, &geo, 1976.0, &[Some(1954), Some(1950)]);
        assert_eq!(frame.traces.len(), ds.cohorts().len());
        assert_eq!(frame.highlights.len(), 2);
        assert_eq!(frame.highlights[0].birth_year, 1954);
        assert_eq!(frame.highlights[1].birth_year, 1950);

        // Unknown cohorts and empty slots are skipped.
        let frame = render_frame(&ds, &geo, 1976.0, &[None, Some(1850)]);
        assert!(frame.highlights.is_empty());
    }
}
