//! Sprite state machine.
//!
//! Each hardware sprite owns its DMA read state (the byte cursor into
//! its 63-byte data block), its expansion state, and a pixel serializer
//! over the 24-bit line register. The VIC host drives the lifecycle:
//! `init_update` at frame start, `init_painting` on the first visible
//! line, `read_line_data` per scanline, then `get_next_pixel` per
//! output pixel.
//!
//! A sprite whose visible attributes change while it is enabled raises
//! `needs_char_cache_refresh` so the host repaints the characters
//! behind it; the flag drops when the sprite stops painting.

use emu_core::{Snapshot, SnapshotError, SnapshotReader, SnapshotWriter};

/// Bytes in one sprite data block (21 lines x 3 bytes).
const DATA_BYTES: u32 = 63;

/// One hardware sprite.
pub struct Sprite {
    /// Screen X coordinate.
    x: u16,
    /// Screen Y coordinate.
    y: u16,
    /// Participates in rendering.
    enabled: bool,
    /// 2-bit pixels instead of 1-bit.
    multicolor: bool,
    /// Horizontal doubling.
    expand_x: bool,
    /// Vertical doubling.
    expand_y: bool,
    /// Drawn in front of the background.
    priority: bool,
    /// Palette for this sprite; `get_next_pixel` returns an index into it.
    colors: [u32; 4],
    /// DMA active for the current raster band.
    painting: bool,
    /// Byte offset of the sprite data block for the current frame.
    pointer: u32,
    /// Data pointer as of the previous line read.
    last_pointer: u32,
    /// The three bytes fetched for the current line (bits 23:16 first).
    line_data: u32,
    /// Remaining bits in `line_data`; 0 means the line is finished.
    bit_read: u32,
    /// Byte offset within the 63-byte data block to fetch next.
    next_byte: u32,
    /// Y-expansion reads each source line twice; true before the first.
    first_y_read: bool,
    /// The characters behind the sprite need repainting.
    needs_char_cache_refresh: bool,
}

impl Sprite {
    #[must_use]
    pub fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            enabled: false,
            multicolor: false,
            expand_x: false,
            expand_y: false,
            priority: false,
            colors: [0; 4],
            painting: false,
            pointer: 0,
            last_pointer: 0,
            line_data: 0,
            bit_read: 0,
            next_byte: 0,
            first_y_read: true,
            needs_char_cache_refresh: false,
        }
    }

    #[must_use]
    pub fn x(&self) -> u16 {
        self.x
    }

    pub fn set_x(&mut self, x: u16) {
        if self.enabled && self.x != x {
            self.needs_char_cache_refresh = true;
        }
        self.x = x;
    }

    #[must_use]
    pub fn y(&self) -> u16 {
        self.y
    }

    pub fn set_y(&mut self, y: u16) {
        if self.enabled && self.y != y {
            self.needs_char_cache_refresh = true;
        }
        self.y = y;
    }

    #[must_use]
    pub fn has_priority(&self) -> bool {
        self.priority
    }

    pub fn set_priority(&mut self, priority: bool) {
        if self.enabled && self.priority != priority {
            self.needs_char_cache_refresh = true;
        }
        self.priority = priority;
    }

    #[must_use]
    pub fn color(&self, n: usize) -> u32 {
        self.colors[n]
    }

    pub fn set_color(&mut self, n: usize, color: u32) {
        self.colors[n] = color;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.needs_char_cache_refresh = true;
        }
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_expand_x(&self) -> bool {
        self.expand_x
    }

    /// Toggling X-expansion mid-line rescales the remaining bit count
    /// so the serializer keeps its remaining-pixel position.
    pub fn set_expand_x(&mut self, expand_x: bool) {
        if self.enabled && self.expand_x != expand_x {
            self.needs_char_cache_refresh = true;
            if !self.is_line_finished() {
                if expand_x {
                    // Never more than one full expanded line.
                    self.bit_read = (self.bit_read << 1).min(48);
                } else {
                    self.bit_read >>= 1;
                }
            }
        }
        self.expand_x = expand_x;
    }

    #[must_use]
    pub fn is_expand_y(&self) -> bool {
        self.expand_y
    }

    pub fn set_expand_y(&mut self, expand_y: bool) {
        if self.enabled && self.expand_y != expand_y {
            self.needs_char_cache_refresh = true;
        }
        self.expand_y = expand_y;
    }

    #[must_use]
    pub fn is_multicolor(&self) -> bool {
        self.multicolor
    }

    pub fn set_multicolor(&mut self, multicolor: bool) {
        self.multicolor = multicolor;
    }

    /// True once every bit of the current line has been serialized.
    #[must_use]
    pub fn is_line_finished(&self) -> bool {
        self.bit_read == 0
    }

    #[must_use]
    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn set_painting(&mut self, painting: bool) {
        if !painting {
            self.needs_char_cache_refresh = false;
        }
        self.painting = painting;
    }

    /// True once the byte cursor has moved past the 63-byte data block.
    #[must_use]
    pub fn is_beyond_last_byte(&self) -> bool {
        self.next_byte >= DATA_BYTES
    }

    #[must_use]
    pub fn needs_char_cache_refresh(&self) -> bool {
        self.needs_char_cache_refresh
    }

    /// Remaining bits in the line register.
    #[must_use]
    pub fn bit_read(&self) -> u32 {
        self.bit_read
    }

    /// Byte cursor into the 63-byte data block.
    #[must_use]
    pub fn next_byte(&self) -> u32 {
        self.next_byte
    }

    /// The 24-bit line register.
    #[must_use]
    pub fn line_data(&self) -> u32 {
        self.line_data
    }

    /// Reset per-frame DMA state.
    pub fn init_update(&mut self) {
        self.next_byte = 0;
        self.painting = false;
        self.line_data = 0;
    }

    /// Start a raster band.
    pub fn init_painting(&mut self) {
        self.next_byte = 0;
        self.painting = true;
        self.first_y_read = true;
    }

    #[must_use]
    pub fn data_pointer(&self) -> u32 {
        self.pointer
    }

    /// Set the byte offset the sprite data is read from.
    pub fn set_data_pointer(&mut self, pointer: u32) {
        self.pointer = pointer;
    }

    /// Fetch the three data bytes for the current line into the 24-bit
    /// line register and prepare the serializer.
    ///
    /// With Y-expansion on, the byte cursor only advances on every
    /// second call so each source line is produced twice. Out-of-range
    /// reads are silently masked to 0.
    pub fn read_line_data(&mut self, memory: &[u8]) {
        let base = (self.pointer + self.next_byte) as usize;
        let fetch = |offset: usize| -> u32 {
            memory.get(base + offset).copied().map_or(0, u32::from)
        };
        self.line_data = (fetch(0) << 16) | (fetch(1) << 8) | fetch(2);

        if self.expand_y {
            if !self.first_y_read {
                self.next_byte += 3;
            }
            self.first_y_read = !self.first_y_read;
        } else {
            self.next_byte += 3;
        }

        if self.pointer != self.last_pointer {
            // Repaint the characters behind the sprite with its new data.
            self.needs_char_cache_refresh = true;
            self.last_pointer = self.pointer;
        }

        // Serialize from the highest bit; X-expansion doubles the count
        // and consumes it at half rate.
        self.bit_read = if self.expand_x { 48 } else { 24 };
    }

    /// Color index of the next pixel on the current line.
    ///
    /// Returns 0 (transparent) when the line is finished. Multicolor
    /// sprites return a 2-bit index 0-3; single-color sprites return
    /// 0 or 2, so index 0 doubles as transparent in both modes.
    pub fn get_next_pixel(&mut self) -> u8 {
        if self.is_line_finished() {
            return 0;
        }
        self.bit_read -= 1;

        // bit_read runs doubled when X-expanded; halve it back down to
        // the shift position.
        let shift = if self.expand_x {
            self.bit_read >> 1
        } else {
            self.bit_read
        };

        if self.multicolor {
            ((self.line_data >> (shift & !1)) & 3) as u8
        } else {
            (((self.line_data >> shift) & 1) << 1) as u8
        }
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot for Sprite {
    fn save(&self, w: &mut SnapshotWriter) {
        w.write_u16(self.x);
        w.write_u16(self.y);
        w.write_bool(self.priority);
        w.write_bool(self.enabled);
        w.write_bool(self.expand_x);
        w.write_bool(self.expand_y);
        w.write_bool(self.first_y_read);
        w.write_bool(self.multicolor);
        w.write_bool(self.painting);
        w.write_bool(self.needs_char_cache_refresh);
        w.write_u32_array(&self.colors);
        w.write_u32(self.bit_read);
        w.write_u32(self.last_pointer);
        w.write_u32(self.line_data);
        w.write_u32(self.next_byte);
        w.write_u32(self.pointer);
    }

    fn restore(&mut self, r: &mut SnapshotReader<'_>) -> Result<(), SnapshotError> {
        self.x = r.read_u16()?;
        self.y = r.read_u16()?;
        self.priority = r.read_bool()?;
        self.enabled = r.read_bool()?;
        self.expand_x = r.read_bool()?;
        self.expand_y = r.read_bool()?;
        self.first_y_read = r.read_bool()?;
        self.multicolor = r.read_bool()?;
        self.painting = r.read_bool()?;
        self.needs_char_cache_refresh = r.read_bool()?;
        r.read_u32_array(&mut self.colors)?;
        self.bit_read = r.read_u32()?;
        self.last_pointer = r.read_u32()?;
        self.line_data = r.read_u32()?;
        self.next_byte = r.read_u32()?;
        self.pointer = r.read_u32()?;
        Ok(())
    }
}
