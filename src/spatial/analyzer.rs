//! Column reconstruction and image-to-section association.

use super::config::{OrphanPolicy, SpatialConfig};
use super::layout::{Column, ImageContext, Margins, PageLayout};
use crate::error::{Error, Result};
use crate::model::{BBox, Page, Section};

/// A fallback step: index of the chosen section, if any.
type Fallback = fn(&ImageContext, &[Section]) -> Option<usize>;

/// Last section on the image's page starting at or above it.
fn same_page_preceding(ctx: &ImageContext, sections: &[Section]) -> Option<usize> {
    sections
        .iter()
        .rposition(|s| s.page == ctx.page && s.position <= ctx.bbox.y0)
}

/// Last section of any earlier page.
fn previous_page(ctx: &ImageContext, sections: &[Section]) -> Option<usize> {
    sections.iter().rposition(|s| s.page < ctx.page)
}

/// First section following the image.
fn following(ctx: &ImageContext, sections: &[Section]) -> Option<usize> {
    sections
        .iter()
        .position(|s| !s.precedes(ctx.page, ctx.bbox.y0))
}

const PRECEDING_CHAIN: &[Fallback] = &[same_page_preceding, previous_page];

/// Reconstructs page layout and scores image/section affinity.
#[derive(Debug, Clone, Default)]
pub struct SpatialAnalyzer {
    config: SpatialConfig,
}

impl SpatialAnalyzer {
    /// Create an analyzer.
    pub fn new(config: SpatialConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Build the layout of a page from its text runs.
    ///
    /// Fails only when the page geometry itself is unusable.
    pub fn analyze_page_layout(&self, page: &Page) -> Result<PageLayout> {
        if !(page.width.is_finite() && page.height.is_finite()) || page.width <= 0.0 || page.height <= 0.0 {
            return Err(Error::Layout {
                page: page.index,
                reason: format!("invalid page size {}x{}", page.width, page.height),
            });
        }

        let text_zones = self.text_blocks(page);

        let columns = if self.config.multi_column {
            self.detect_columns(&text_zones)
        } else {
            text_zones
                .iter()
                .copied()
                .reduce(|a, b| a.union(&b))
                .map(|b| vec![Column::new(b.x0, b.x1)])
                .unwrap_or_default()
        };
        let margins = Self::margins(page, &text_zones);

        log::debug!(
            "Page {} layout: {} columns, margins {:?}",
            page.index,
            columns.len(),
            margins
        );

        Ok(PageLayout {
            page: page.index,
            width: page.width,
            height: page.height,
            columns,
            margins,
            text_zones,
        })
    }

    /// Group the page's lines into text blocks.
    ///
    /// A line joins the block above it when their left edges align and the
    /// vertical gap stays within `block_line_gap`.
    fn text_blocks(&self, page: &Page) -> Vec<BBox> {
        let mut lines: Vec<BBox> = page
            .spans
            .iter()
            .filter(|s| !s.trimmed().is_empty() && s.bbox.is_finite())
            .map(|s| s.bbox)
            .collect();
        lines.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0)));

        let mut blocks: Vec<BBox> = Vec::new();
        for line in lines {
            let open = blocks.iter_mut().rev().find(|block| {
                let gap = line.y0 - block.y1;
                (line.x0 - block.x0).abs() <= self.config.block_align_tolerance
                    && gap >= 0.0
                    && gap <= self.config.block_line_gap
            });
            match open {
                Some(block) => *block = block.union(&line),
                None => blocks.push(line),
            }
        }
        blocks
    }

    fn detect_columns(&self, zones: &[BBox]) -> Vec<Column> {
        let mut sorted: Vec<&BBox> = zones.iter().collect();
        sorted.sort_by(|a, b| a.x0.total_cmp(&b.x0));

        let Some(first) = sorted.first() else {
            return Vec::new();
        };

        let mut columns = Vec::new();
        let mut current = Column::new(first.x0, first.x1);
        for zone in &sorted[1..] {
            if zone.x0 - current.x1 > self.config.min_column_gap {
                columns.push(current);
                current = Column::new(zone.x0, zone.x1);
            } else {
                current.x1 = current.x1.max(zone.x1);
            }
        }
        columns.push(current);
        columns
    }

    fn margins(page: &Page, zones: &[BBox]) -> Margins {
        let Some(content) = zones.iter().copied().reduce(|a, b| a.union(&b)) else {
            return Margins::default();
        };
        let rect = page.rect();
        Margins {
            top: content.y0 - rect.y0,
            bottom: rect.y1 - content.y1,
            left: content.x0 - rect.x0,
            right: rect.x1 - content.x1,
        }
    }

    /// Derive the spatial context of one image.
    pub fn create_image_context(&self, bbox: &BBox, page: &Page, layout: &PageLayout) -> ImageContext {
        let (center_x, _) = bbox.center();
        ImageContext {
            bbox: *bbox,
            page: page.index,
            area: bbox.area(),
            aspect_ratio: bbox.aspect_ratio().unwrap_or(1.0),
            column: layout.column_at(center_x),
            nearby_text: self.nearby_text(bbox, page),
            section_distances: Default::default(),
        }
    }

    fn nearby_text(&self, bbox: &BBox, page: &Page) -> Vec<String> {
        let search = bbox.expand(self.config.context_radius);
        page.spans
            .iter()
            .filter(|s| s.bbox.intersects(&search))
            .map(|s| s.trimmed())
            .filter(|t| t.chars().count() > self.config.min_token_length)
            .take(self.config.max_nearby_tokens)
            .map(str::to_string)
            .collect()
    }

    /// Pick the section an image illustrates.
    ///
    /// `sections` must be in reading order. Only sections whose heading starts
    /// at or above the image in reading order are scored, so a heading below
    /// the image never claims it by score however close it sits. The best
    /// candidate is accepted when it clears the threshold. Otherwise the
    /// fallback chain runs, and only [`OrphanPolicy::NearestSection`] lets a
    /// following section take the image.
    pub fn associate_image_to_section<'s>(
        &self,
        context: &mut ImageContext,
        sections: &'s [Section],
        layout: &PageLayout,
    ) -> Option<&'s Section> {
        if sections.is_empty() {
            return None;
        }

        match self.best_scored(context, sections, layout) {
            Ok(Some((index, score))) if score > self.config.association_threshold => {
                log::debug!(
                    "Image on page {} associated to {} (score {:.2})",
                    context.page,
                    sections[index].number,
                    score
                );
                return Some(&sections[index]);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Association scoring failed, using fallback: {}", e),
        }

        let chosen = self.fallback_chain().iter().find_map(|step| step(context, sections));
        match chosen {
            Some(index) => {
                log::debug!(
                    "Image on page {} falls back to {}",
                    context.page,
                    sections[index].number
                );
                Some(&sections[index])
            }
            None => {
                log::debug!("Image on page {} left unassociated", context.page);
                None
            }
        }
    }

    fn fallback_chain(&self) -> Vec<Fallback> {
        let mut chain = PRECEDING_CHAIN.to_vec();
        if self.config.orphan_policy == OrphanPolicy::NearestSection {
            chain.push(following);
        }
        chain
    }

    /// Highest score among sections preceding the image; earliest wins ties.
    ///
    /// Following sections are skipped before scoring and get no entry in
    /// `section_distances`.
    fn best_scored(
        &self,
        context: &mut ImageContext,
        sections: &[Section],
        layout: &PageLayout,
    ) -> Result<Option<(usize, f32)>> {
        let mut best: Option<(usize, f32)> = None;

        for (i, section) in sections.iter().enumerate() {
            if !section.precedes(context.page, context.bbox.y0) {
                continue;
            }

            let distance = self.spatial_distance(context, section);
            context.section_distances.insert(section.number.clone(), distance);

            let score = self.association_score(context, section, layout, distance);
            if !score.is_finite() {
                return Err(Error::Other(format!(
                    "non-finite score for section {}",
                    section.number
                )));
            }
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        Ok(best)
    }

    /// Vertical distance on the same page; 1000 per page otherwise.
    pub fn spatial_distance(&self, context: &ImageContext, section: &Section) -> f32 {
        if context.page == section.page {
            (context.bbox.y0 - section.position).abs()
        } else {
            1000.0 * context.page.abs_diff(section.page) as f32
        }
    }

    fn association_score(&self, context: &ImageContext, section: &Section, layout: &PageLayout, distance: f32) -> f32 {
        let mut score = 0.0;

        let distance_score = (1.0 - distance / self.config.max_distance).max(0.0);
        score += 0.4 * distance_score;

        if context.page == section.page {
            score += 0.3;

            // Column indices only mean something on the layout's own page.
            if let Some(column) = context.column {
                if layout.column_at(section.x) == Some(column) {
                    score += self.config.same_column_bonus;
                }
            }
        }

        score += 0.2 * Self::text_overlap(context, section);
        score.clamp(0.0, 1.0)
    }

    fn text_overlap(context: &ImageContext, section: &Section) -> f32 {
        let title = section.title.to_lowercase();
        let words: Vec<&str> = title.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }
        let nearby = context.nearby_joined();
        let hits = words.iter().filter(|w| nearby.contains(*w)).count();
        hits as f32 / words.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextSpan;

    fn span(text: &str, x0: f32, y0: f32, x1: f32) -> TextSpan {
        TextSpan::new(text, 10.0, "Helvetica", BBox::new(x0, y0, x1, y0 + 10.0))
    }

    fn sections() -> Vec<Section> {
        vec![
            Section::new("1.1", "Overview", 0, 100.0).with_x(72.0),
            Section::new("1.2", "Wiring", 0, 300.0).with_x(72.0),
        ]
    }

    fn context_at(analyzer: &SpatialAnalyzer, page: &Page, y0: f32) -> (ImageContext, PageLayout) {
        let layout = analyzer.analyze_page_layout(page).unwrap();
        let bbox = BBox::from_size(100.0, y0, 200.0, 120.0);
        (analyzer.create_image_context(&bbox, page, &layout), layout)
    }

    #[test]
    fn test_two_columns() {
        let page = Page::letter(0)
            .with_span(span("left column text", 72.0, 100.0, 290.0))
            .with_span(span("more left text", 80.0, 120.0, 280.0))
            .with_span(span("right column text", 320.0, 100.0, 540.0));
        let layout = SpatialAnalyzer::default().analyze_page_layout(&page).unwrap();

        assert_eq!(layout.columns, vec![Column::new(72.0, 290.0), Column::new(320.0, 540.0)]);
        assert!(layout.is_multi_column());
        assert_eq!(layout.margins.left, 72.0);
        assert_eq!(layout.margins.right, 72.0);
        assert_eq!(layout.margins.top, 100.0);
    }

    #[test]
    fn test_stacked_lines_form_one_block() {
        let page = Page::letter(0)
            .with_span(span("The pump is mounted", 72.0, 100.0, 290.0))
            .with_span(span("on the rear frame and", 72.0, 112.0, 280.0))
            .with_span(span("held by four bolts.", 73.0, 124.0, 250.0))
            .with_span(span("Next paragraph", 72.0, 160.0, 260.0))
            .with_span(span("Sidebar note", 320.0, 114.0, 540.0));
        let layout = SpatialAnalyzer::default().analyze_page_layout(&page).unwrap();

        assert_eq!(
            layout.text_zones,
            vec![
                BBox::new(72.0, 100.0, 290.0, 134.0),
                BBox::new(320.0, 114.0, 540.0, 124.0),
                BBox::new(72.0, 160.0, 260.0, 170.0),
            ]
        );
        assert_eq!(layout.columns, vec![Column::new(72.0, 290.0), Column::new(320.0, 540.0)]);
    }

    #[test]
    fn test_empty_page_layout() {
        let layout = SpatialAnalyzer::default().analyze_page_layout(&Page::a4(2)).unwrap();
        assert!(layout.columns.is_empty());
        assert_eq!(layout.margins, Margins::default());
        assert_eq!(layout.page, 2);
    }

    #[test]
    fn test_invalid_geometry_is_layout_error() {
        let page = Page::new(4, 0.0, 792.0);
        let err = SpatialAnalyzer::default().analyze_page_layout(&page).unwrap_err();
        assert!(matches!(err, Error::Layout { page: 4, .. }));
    }

    #[test]
    fn test_nearby_text() {
        let page = Page::letter(0)
            .with_span(span("Figure 2", 100.0, 330.0, 160.0))
            .with_span(span("ok", 100.0, 340.0, 110.0))
            .with_span(span("far away", 100.0, 700.0, 160.0));
        let analyzer = SpatialAnalyzer::default();
        let (ctx, _) = context_at(&analyzer, &page, 200.0);
        assert_eq!(ctx.nearby_text, vec!["Figure 2".to_string()]);
        assert_eq!(ctx.area, 200.0 * 120.0);
    }

    #[test]
    fn test_image_after_section_associates_to_it() {
        let page = Page::letter(0).with_span(span("body", 72.0, 150.0, 400.0));
        let analyzer = SpatialAnalyzer::default();
        let (mut ctx, layout) = context_at(&analyzer, &page, 250.0);

        let sections = sections();
        let chosen = analyzer.associate_image_to_section(&mut ctx, &sections, &layout);
        assert_eq!(chosen.map(|s| s.number.as_str()), Some("1.1"));
        assert_eq!(ctx.section_distances.get("1.1"), Some(&150.0));
        assert!(!ctx.section_distances.contains_key("1.2"));
    }

    #[test]
    fn test_closer_heading_below_is_not_scored() {
        let page = Page::letter(0).with_span(span("Wiring harness", 100.0, 420.0, 220.0));
        let analyzer = SpatialAnalyzer::default();
        let (mut ctx, layout) = context_at(&analyzer, &page, 290.0);

        let sections = sections();
        let chosen = analyzer.associate_image_to_section(&mut ctx, &sections, &layout);
        assert_eq!(chosen.map(|s| s.number.as_str()), Some("1.1"));
        assert_eq!(ctx.section_distances.get("1.1"), Some(&190.0));
        assert!(!ctx.section_distances.contains_key("1.2"));
    }

    #[test]
    fn test_image_before_any_section() {
        let page = Page::letter(0);
        let sections = sections();

        let analyzer = SpatialAnalyzer::default();
        let (mut ctx, layout) = context_at(&analyzer, &page, 50.0);
        assert!(analyzer.associate_image_to_section(&mut ctx, &sections, &layout).is_none());

        let analyzer = SpatialAnalyzer::new(SpatialConfig::default().with_orphan_policy(OrphanPolicy::NearestSection));
        let (mut ctx, layout) = context_at(&analyzer, &page, 50.0);
        let chosen = analyzer.associate_image_to_section(&mut ctx, &sections, &layout);
        assert_eq!(chosen.map(|s| s.number.as_str()), Some("1.1"));

        assert!(analyzer.associate_image_to_section(&mut ctx, &[], &layout).is_none());
    }

    #[test]
    fn test_previous_page_fallback() {
        let page = Page::letter(1);
        let analyzer = SpatialAnalyzer::default();
        let (mut ctx, layout) = context_at(&analyzer, &page, 400.0);

        let sections = sections();
        let chosen = analyzer.associate_image_to_section(&mut ctx, &sections, &layout);
        assert_eq!(chosen.map(|s| s.number.as_str()), Some("1.2"));
        assert_eq!(ctx.section_distances.get("1.2"), Some(&1000.0));
    }

    #[test]
    fn test_text_overlap_counts() {
        let analyzer = SpatialAnalyzer::default();
        let page = Page::letter(0).with_span(span("Pump wiring detail", 100.0, 330.0, 250.0));
        let (ctx, _) = context_at(&analyzer, &page, 200.0);

        let section = Section::new("3", "Pump Wiring Overview", 0, 0.0);
        let overlap = SpatialAnalyzer::text_overlap(&ctx, &section);
        assert!((overlap - 2.0 / 3.0).abs() < 1e-6);
    }
}
