//! Static Helvetica metrics for the export layout.
//!
//! Widths are in em units (AFM widths / 1000), covering ASCII 0x20..=0x7E.
//! Index = (char as usize) - 32. Anything outside that range, accented
//! Spanish letters included, falls back to `average_char_width`; the wrap is
//! an estimate, not typesetting.

use serde::{Deserialize, Serialize};

/// A4 at 10pt with 20mm side margins: 170mm ≈ 481.9pt ≈ 48.2em.
const A4_TEXT_WIDTH_EM: f32 = 48.2;

/// Layout parameters for one export page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    pub font_size_pt: u8,
    /// Usable text width in em units at `font_size_pt`.
    pub text_width_em: f32,
    /// Body line slots between header and footer.
    pub usable_height_lines: u16,
    /// Below this many free lines the technical analysis is replaced by a
    /// pointer to the web platform.
    pub min_analysis_lines: u16,
}

/// A4 portrait, 10pt Helvetica, 4mm line pitch between 35mm header and footer bands.
pub fn a4_page_config() -> PageConfig {
    PageConfig {
        font_size_pt: 10,
        text_width_em: A4_TEXT_WIDTH_EM,
        usable_height_lines: 56,
        min_analysis_lines: 4,
    }
}

/// Static character-width table.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.measure_char(c)).sum()
    }

    pub fn measure_char(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else {
            self.average_char_width
        }
    }
}

/// Helvetica (regular), the standard PDF base font.
pub static HELVETICA: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.52,
    space_width: 0.278,
};
