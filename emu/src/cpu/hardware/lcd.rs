//! Picture processor: scanline renderer for modes 0/1/3/4, DISPSTAT
//! maintenance and the per-frame OAM snapshot.
//!
//! Each scanline is 1232 master cycles; the first 960 are the active draw
//! window, the rest is HBLANK. A frame is 228 scanlines (160 visible + 68
//! VBLANK), which at one step per master cycle makes 280,896 cycles per
//! frame. Rendering happens once per visible line at the end of the active
//! window; composition picks, per pixel, the first opaque layer among the
//! sprite layer and the backgrounds in ascending priority order.

use object_attributes::{ColorMode, ObjAttributes, ObjMode, RotationScaling, TransformationKind};

use crate::bitwise::Bits;

pub mod object_attributes;

/// GBA display width
pub const DISPLAY_WIDTH: usize = 240;

/// GBA display height
pub const DISPLAY_HEIGHT: usize = 160;

const CYCLES_PER_SCANLINE: u32 = 1232;
const ACTIVE_SCANLINE_CYCLES: u32 = 960;
const TOTAL_SCANLINES: u16 = 228;

/// Text background dimensions by size code.
const TEXT_BG_SIZES: [(i32, i32); 4] = [(256, 256), (512, 256), (256, 512), (512, 512)];

/// A BGR555 palette color.
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u16);

impl Color {
    #[must_use]
    pub fn red(self) -> u8 {
        self.0.get_bits(0..=4) as u8
    }

    #[must_use]
    pub fn green(self) -> u8 {
        self.0.get_bits(5..=9) as u8
    }

    #[must_use]
    pub fn blue(self) -> u8 {
        self.0.get_bits(10..=14) as u8
    }
}

/// Expands a 5-bit channel to 8 bits.
const fn expand_channel(value: u8) -> u8 {
    (value as u16 * 255 / 31) as u8
}

#[derive(Default, Clone, Copy)]
struct Pixel {
    color: Color,
    priority: u8,
    valid: bool,
}

/// Rotation/scaling state for background layers 2 and 3: the 2x2 parameter
/// matrix (8.8 fixed point) and the 28-bit signed reference point (20.8
/// fixed point, sign-extended from bit 27).
#[derive(Default, Clone, Copy)]
pub struct BgAffine {
    pub pa: u16,
    pub pb: u16,
    pub pc: u16,
    pub pd: u16,
    pub x: u32,
    pub y: u32,
}

const fn sign_extend_28(value: u32) -> i32 {
    ((value << 4) as i32) >> 4
}

/// Events produced by one LCD cycle, applied by the bus (IF bits, DMA start
/// conditions).
#[derive(Default)]
pub struct LcdStepOutput {
    pub request_vblank_irq: bool,
    pub request_hblank_irq: bool,
    pub request_vcount_irq: bool,
    pub entered_vblank: bool,
    pub entered_hblank: bool,
}

pub struct Lcd {
    /// LCD Control
    pub dispcnt: u16,
    /// General LCD Status (VBLANK/HBLANK/VCOUNT flags and IRQ enables)
    pub dispstat: u16,
    /// Vertical Counter
    pub vcount: u16,
    /// BG0-BG3 Control
    pub bgcnt: [u16; 4],
    /// BG0-BG3 X-Offset
    pub bghofs: [u16; 4],
    /// BG0-BG3 Y-Offset
    pub bgvofs: [u16; 4],
    /// Rotation/scaling state for BG2 and BG3
    pub bg_affine: [BgAffine; 2],

    /// From 0x05000000: 256 background + 256 sprite entries of BGR555.
    pub palette_ram: Vec<u8>,
    /// From 0x06000000: 96 KiB of tile data / bitmap / OBJ tiles.
    pub video_ram: Vec<u8>,
    /// From 0x07000000: 128 object attribute entries.
    pub object_attribute_memory: Vec<u8>,

    frame_buffer: Vec<u8>,
    cycles: u32,

    oam_snapshot: [ObjAttributes; 128],
    rotation_scaling_params: [RotationScaling; 32],
}

impl Default for Lcd {
    fn default() -> Self {
        Self {
            dispcnt: 0,
            dispstat: 0,
            vcount: 0,
            bgcnt: [0; 4],
            bghofs: [0; 4],
            bgvofs: [0; 4],
            bg_affine: [BgAffine::default(); 2],
            palette_ram: vec![0; 0x400],
            video_ram: vec![0; 0x18000],
            object_attribute_memory: vec![0; 0x400],
            frame_buffer: vec![0; DISPLAY_WIDTH * DISPLAY_HEIGHT * 4],
            cycles: 0,
            oam_snapshot: [ObjAttributes::default(); 128],
            rotation_scaling_params: [RotationScaling::default(); 32],
        }
    }
}

impl Lcd {
    /// Advances one master cycle: tracks the scanline position, renders at
    /// the end of the active window, snapshots OAM when the frame wraps and
    /// maintains the DISPSTAT flags.
    pub fn step(&mut self) -> LcdStepOutput {
        let mut output = LcdStepOutput::default();

        self.cycles += 1;
        if self.cycles >= CYCLES_PER_SCANLINE {
            self.cycles -= CYCLES_PER_SCANLINE;
            self.vcount += 1;
            if self.vcount >= TOTAL_SCANLINES {
                self.vcount = 0;
                (self.oam_snapshot, self.rotation_scaling_params) =
                    object_attributes::get_attributes(&self.object_attribute_memory);
            }
        }

        if self.cycles == ACTIVE_SCANLINE_CYCLES && usize::from(self.vcount) < DISPLAY_HEIGHT {
            self.render_scanline();
        }

        self.update_display_status(&mut output);
        output
    }

    /// RGBA8888 output, one byte per channel, alpha always 0xFF.
    #[must_use]
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    fn update_display_status(&mut self, output: &mut LcdStepOutput) {
        if usize::from(self.vcount) >= DISPLAY_HEIGHT {
            if !self.dispstat.get_bit(0) {
                output.entered_vblank = true;
                if self.dispstat.get_bit(3) {
                    output.request_vblank_irq = true;
                }
            }
            self.dispstat.set_bit_on(0);
        } else {
            self.dispstat.set_bit_off(0);
        }

        if self.cycles >= ACTIVE_SCANLINE_CYCLES {
            if !self.dispstat.get_bit(1) {
                output.entered_hblank = true;
                if self.dispstat.get_bit(4) {
                    output.request_hblank_irq = true;
                }
            }
            self.dispstat.set_bit_on(1);
        } else {
            self.dispstat.set_bit_off(1);
        }

        if self.vcount == u16::from(self.dispstat.get_byte(1)) {
            if !self.dispstat.get_bit(2) && self.dispstat.get_bit(5) {
                output.request_vcount_irq = true;
            }
            self.dispstat.set_bit_on(2);
        } else {
            self.dispstat.set_bit_off(2);
        }
    }

    fn render_scanline(&mut self) {
        let y = i32::from(self.vcount);
        let mut layers = [[Pixel::default(); DISPLAY_WIDTH]; 5];

        match self.dispcnt & 0b111 {
            0 => {
                for bg_index in 0..4 {
                    self.render_text_bg_scanline(&mut layers[bg_index], bg_index, y);
                }
            }
            1 => {
                self.render_text_bg_scanline(&mut layers[0], 0, y);
                self.render_text_bg_scanline(&mut layers[1], 1, y);
                self.render_affine_bg_scanline(&mut layers[2], 2, y);
            }
            3 => self.render_bitmap_scanline(&mut layers[2], y),
            4 => self.render_paletted_bitmap_scanline(&mut layers[2], y),
            _ => {}
        }

        self.render_obj_scanline(&mut layers[4], y);

        for x in 0..DISPLAY_WIDTH {
            self.compose_pixel(&layers, x, y as usize);
        }
    }

    fn color_from_palette(&self, palette_index: usize, palette_base: usize) -> Color {
        let offset = palette_base + palette_index * 2;
        Color(u16::from(self.palette_ram[offset]) | u16::from(self.palette_ram[offset + 1]) << 8)
    }

    /// VRAM sampling for the render paths; out-of-range tile addresses wrap
    /// instead of faulting.
    fn vram(&self, index: usize) -> u8 {
        self.video_ram[index % 0x18000]
    }

    /// Samples one pixel of an 8x8 tile; color index 0 is transparent.
    fn tile_pixel(
        &self,
        tile_data_addr: usize,
        x: usize,
        y: usize,
        palette_bank: usize,
        palette_base: usize,
        use_256_colors: bool,
    ) -> Option<Color> {
        let color_index = if use_256_colors {
            usize::from(self.vram(tile_data_addr + y * 8 + x))
        } else {
            usize::from((self.vram(tile_data_addr + y * 4 + x / 2) >> (4 * (x % 2))) & 0xF)
        };

        if color_index == 0 {
            return None;
        }

        let palette_index = if use_256_colors {
            color_index
        } else {
            palette_bank * 16 + color_index
        };
        Some(self.color_from_palette(palette_index, palette_base))
    }

    fn render_text_bg_scanline(&self, line: &mut [Pixel; DISPLAY_WIDTH], bg_index: usize, y: i32) {
        if !self.dispcnt.get_bit(8 + bg_index as u8) {
            return;
        }

        let control = self.bgcnt[bg_index];
        let size_code = usize::from(control.get_bits(14..=15));
        let (bg_width, bg_height) = TEXT_BG_SIZES[size_code];
        let use_256_colors = control.get_bit(7);
        let tile_size: usize = if use_256_colors { 64 } else { 32 };
        let tile_data_base = usize::from(control.get_bits(2..=3)) * 16 * 1024;
        let tile_map_base = usize::from(control.get_bits(8..=12)) * 2 * 1024;
        let priority = (control & 0b11) as u8;

        let bg_y = (y + i32::from(self.bgvofs[bg_index] & 0x1FF)).rem_euclid(bg_height);
        for x in 0..DISPLAY_WIDTH as i32 {
            let bg_x = (x + i32::from(self.bghofs[bg_index] & 0x1FF)).rem_euclid(bg_width);

            // screen blocks beyond the first cover the 512-pixel extents
            let mut tile_map_addr = tile_map_base;
            let mut area_x = bg_x as usize;
            let mut area_y = bg_y as usize;
            match size_code {
                1 => {
                    tile_map_addr += (area_x / 256) * 2048;
                    area_x %= 256;
                }
                2 => {
                    tile_map_addr += (area_y / 256) * 2048;
                    area_y %= 256;
                }
                3 => {
                    tile_map_addr += (area_y / 256) * 4096 + (area_x / 256) * 2048;
                    area_x %= 256;
                    area_y %= 256;
                }
                _ => {}
            }
            tile_map_addr += ((area_y / 8) * 32 + area_x / 8) * 2;
            let entry =
                u16::from(self.vram(tile_map_addr)) | u16::from(self.vram(tile_map_addr + 1)) << 8;

            let tile_index = usize::from(entry & 0x3FF);
            let tile_data_addr = tile_data_base + tile_index * tile_size;

            let mut tile_x = (bg_x % 8) as usize;
            let mut tile_y = (bg_y % 8) as usize;
            if entry.get_bit(10) {
                tile_x = 7 - tile_x;
            }
            if entry.get_bit(11) {
                tile_y = 7 - tile_y;
            }
            let palette_bank = usize::from(entry.get_bits(12..=15));

            if let Some(color) =
                self.tile_pixel(tile_data_addr, tile_x, tile_y, palette_bank, 0, use_256_colors)
            {
                line[x as usize] = Pixel {
                    color,
                    priority,
                    valid: true,
                };
            }
        }
    }

    /// Rotation/scaling background: u = PA·x + PB·y + BGX, v = PC·x + PD·y +
    /// BGY in 8.8 fixed point; the integer parts address a 256-color tiled
    /// background with one-byte map entries.
    fn render_affine_bg_scanline(
        &self,
        line: &mut [Pixel; DISPLAY_WIDTH],
        bg_index: usize,
        y: i32,
    ) {
        if !self.dispcnt.get_bit(8 + bg_index as u8) {
            return;
        }

        let control = self.bgcnt[bg_index];
        let affine = self.bg_affine[bg_index - 2];
        let pa = i32::from(affine.pa as i16);
        let pb = i32::from(affine.pb as i16);
        let pc = i32::from(affine.pc as i16);
        let pd = i32::from(affine.pd as i16);
        let reference_x = sign_extend_28(affine.x);
        let reference_y = sign_extend_28(affine.y);

        let dimension = 128 << control.get_bits(14..=15);
        let wrap = control.get_bit(13);
        let tile_data_base = usize::from(control.get_bits(2..=3)) * 16 * 1024;
        let tile_map_base = usize::from(control.get_bits(8..=12)) * 2 * 1024;
        let priority = (control & 0b11) as u8;
        let map_width = (dimension / 8) as usize;

        for x in 0..DISPLAY_WIDTH as i32 {
            let u = pa * x + pb * y + reference_x;
            let v = pc * x + pd * y + reference_y;
            let mut texture_x = u >> 8;
            let mut texture_y = v >> 8;

            if wrap {
                texture_x = texture_x.rem_euclid(dimension);
                texture_y = texture_y.rem_euclid(dimension);
            } else if texture_x < 0
                || texture_x >= dimension
                || texture_y < 0
                || texture_y >= dimension
            {
                continue;
            }

            let tile_index = usize::from(self.vram(
                tile_map_base + (texture_y as usize / 8) * map_width + texture_x as usize / 8,
            ));
            let tile_data_addr = tile_data_base + tile_index * 64;
            let color_index = usize::from(
                self.vram(tile_data_addr + (texture_y as usize % 8) * 8 + texture_x as usize % 8),
            );
            if color_index == 0 {
                continue;
            }
            line[x as usize] = Pixel {
                color: self.color_from_palette(color_index, 0),
                priority,
                valid: true,
            };
        }
    }

    /// Mode 3: 240x160 direct-color bitmap.
    fn render_bitmap_scanline(&self, line: &mut [Pixel; DISPLAY_WIDTH], y: i32) {
        for x in 0..DISPLAY_WIDTH {
            let address = (y as usize * DISPLAY_WIDTH + x) * 2;
            let value =
                u16::from(self.video_ram[address]) | u16::from(self.video_ram[address + 1]) << 8;
            line[x] = Pixel {
                color: Color(value),
                priority: 0,
                valid: true,
            };
        }
    }

    /// Mode 4: 240x160 paletted bitmap; DISPCNT bit 4 selects the page.
    fn render_paletted_bitmap_scanline(&self, line: &mut [Pixel; DISPLAY_WIDTH], y: i32) {
        let page: usize = if self.dispcnt.get_bit(4) { 0xA000 } else { 0 };
        for x in 0..DISPLAY_WIDTH {
            let palette_index = usize::from(self.video_ram[page + y as usize * DISPLAY_WIDTH + x]);
            line[x] = Pixel {
                color: self.color_from_palette(palette_index, 0),
                priority: 0,
                valid: true,
            };
        }
    }

    fn render_obj_scanline(&self, line: &mut [Pixel; DISPLAY_WIDTH], y: i32) {
        if !self.dispcnt.get_bit(12) {
            return;
        }

        let one_dimensional_mapping = self.dispcnt.get_bit(6);
        let bitmap_mode = self.dispcnt & 0b111 >= 3;
        // in bitmap modes the first half of OBJ VRAM belongs to the bitmap
        let obj_tile_base: usize = if bitmap_mode { 0x14000 } else { 0x10000 };

        for entry in &self.oam_snapshot {
            if entry.attribute0.obj_mode == ObjMode::Disabled {
                continue;
            }
            let (width, height) = entry.size();
            if width == 0 {
                continue;
            }

            // Y wraps into [-128, 160), X into [-256, 256)
            let mut sprite_y = i32::from(entry.attribute0.y_coordinate);
            if sprite_y >= DISPLAY_HEIGHT as i32 {
                sprite_y -= 256;
            }
            let mut sprite_x = i32::from(entry.attribute1.x_coordinate);
            if sprite_x >= 256 {
                sprite_x -= 512;
            }

            let double_size = entry.attribute0.obj_mode == ObjMode::AffineDouble;
            let (bound_width, bound_height) = if double_size {
                (width * 2, height * 2)
            } else {
                (width, height)
            };

            if y < sprite_y || y >= sprite_y + bound_height {
                continue;
            }
            let local_y = y - sprite_y;

            let use_256_colors = entry.attribute0.color_mode == ColorMode::Palette8bpp;
            let tile_size: usize = if use_256_colors { 64 } else { 32 };
            let tile_number = if use_256_colors {
                i32::from(entry.attribute2.tile_number) / 2
            } else {
                i32::from(entry.attribute2.tile_number)
            };
            let tiles_per_row = if one_dimensional_mapping { width / 8 } else { 32 };

            for local_x in 0..bound_width {
                let screen_x = sprite_x + local_x;
                if !(0..DISPLAY_WIDTH as i32).contains(&screen_x) {
                    continue;
                }

                let (texture_x, texture_y) = match entry.attribute1.transformation_kind {
                    TransformationKind::Flip {
                        horizontal_flip,
                        vertical_flip,
                    } => {
                        let texture_x = if horizontal_flip {
                            width - 1 - local_x
                        } else {
                            local_x
                        };
                        let texture_y = if vertical_flip {
                            height - 1 - local_y
                        } else {
                            local_y
                        };
                        (texture_x, texture_y)
                    }
                    TransformationKind::RotationScaling {
                        rotation_scaling_parameter,
                    } => {
                        // the matrix is applied around the bounding-box
                        // centre, mapping back into sprite space
                        let params =
                            self.rotation_scaling_params[rotation_scaling_parameter as usize];
                        let delta_x = local_x - bound_width / 2;
                        let delta_y = local_y - bound_height / 2;
                        let texture_x =
                            ((params.pa() * delta_x + params.pb() * delta_y) >> 8) + width / 2;
                        let texture_y =
                            ((params.pc() * delta_x + params.pd() * delta_y) >> 8) + height / 2;
                        if !(0..width).contains(&texture_x) || !(0..height).contains(&texture_y) {
                            continue;
                        }
                        (texture_x, texture_y)
                    }
                };

                let current_tile =
                    tile_number + (texture_y / 8) * tiles_per_row + texture_x / 8;
                let tile_data_addr = obj_tile_base + current_tile as usize * tile_size;

                let Some(color) = self.tile_pixel(
                    tile_data_addr,
                    (texture_x % 8) as usize,
                    (texture_y % 8) as usize,
                    usize::from(entry.attribute2.palette_number),
                    0x200,
                    use_256_colors,
                ) else {
                    continue;
                };

                let incumbent = line[screen_x as usize];
                if !incumbent.valid || entry.attribute2.priority < incumbent.priority {
                    line[screen_x as usize] = Pixel {
                        color,
                        priority: entry.attribute2.priority,
                        valid: true,
                    };
                }
            }
        }
    }

    fn compose_pixel(&mut self, layers: &[[Pixel; DISPLAY_WIDTH]; 5], x: usize, y: usize) {
        let mut final_pixel = Pixel::default();
        let mut highest_priority = 4;
        let mut found = false;

        let sprite = layers[4][x];
        if sprite.valid {
            final_pixel = sprite;
            highest_priority = sprite.priority;
            found = true;
        }

        for layer in &layers[0..4] {
            let pixel = layer[x];
            if pixel.valid && (!found || pixel.priority < highest_priority) {
                final_pixel = pixel;
                highest_priority = pixel.priority;
                found = true;
            }
        }

        if !found {
            // backdrop: palette index 0
            final_pixel.color = self.color_from_palette(0, 0);
        }

        let offset = (y * DISPLAY_WIDTH + x) * 4;
        self.frame_buffer[offset] = expand_channel(final_pixel.color.red());
        self.frame_buffer[offset + 1] = expand_channel(final_pixel.color.green());
        self.frame_buffer[offset + 2] = expand_channel(final_pixel.color.blue());
        self.frame_buffer[offset + 3] = 0xFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run_scanlines(lcd: &mut Lcd, lines: u32) {
        for _ in 0..lines * CYCLES_PER_SCANLINE {
            lcd.step();
        }
    }

    fn pixel(lcd: &Lcd, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * DISPLAY_WIDTH + x) * 4;
        lcd.frame_buffer()[offset..offset + 4].try_into().unwrap()
    }

    #[test]
    fn frame_timing_and_vcount() {
        let mut lcd = Lcd::default();
        run_scanlines(&mut lcd, 1);
        assert_eq!(lcd.vcount, 1);
        run_scanlines(&mut lcd, 227);
        assert_eq!(lcd.vcount, 0);
    }

    #[test]
    fn dispstat_flags_follow_the_beam() {
        let mut lcd = Lcd::default();
        // cycle 1..960: active window
        for _ in 0..ACTIVE_SCANLINE_CYCLES - 1 {
            lcd.step();
        }
        assert!(!lcd.dispstat.get_bit(1));
        let out = lcd.step();
        assert!(out.entered_hblank);
        assert!(lcd.dispstat.get_bit(1));

        // VBLANK starts at line 160
        run_scanlines(&mut lcd, 160);
        assert!(lcd.dispstat.get_bit(0));
    }

    #[test]
    fn vblank_irq_requested_when_enabled() {
        let mut lcd = Lcd::default();
        lcd.dispstat = 1 << 3;
        let mut requested = false;
        for _ in 0..161 * CYCLES_PER_SCANLINE {
            requested |= lcd.step().request_vblank_irq;
        }
        assert!(requested);
    }

    #[test]
    fn vcount_match_flag_and_irq() {
        let mut lcd = Lcd::default();
        lcd.dispstat = (3 << 8) | 1 << 5; // match line 3, irq enabled
        let mut requested = false;
        for _ in 0..4 * CYCLES_PER_SCANLINE {
            requested |= lcd.step().request_vcount_irq;
        }
        assert!(requested);
        assert!(lcd.dispstat.get_bit(2));
    }

    #[test]
    fn mode4_backdrop_scanline_is_palette_zero() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4;
        // palette 0 = red (0x001F)
        lcd.palette_ram[0] = 0x1F;
        lcd.palette_ram[1] = 0x00;

        run_scanlines(&mut lcd, 1);
        for x in 0..DISPLAY_WIDTH {
            assert_eq!(pixel(&lcd, x, 0), [0xFF, 0, 0, 0xFF]);
        }
    }

    #[test]
    fn mode3_pixel_matches_vram_halfword() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 3;
        lcd.dispcnt.set_bit_on(10); // BG2 enable
        // pixel (1, 0) = green (0x03E0)
        lcd.video_ram[2] = 0xE0;
        lcd.video_ram[3] = 0x03;

        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 1, 0), [0, 0xFF, 0, 0xFF]);
        assert_eq!(pixel(&lcd, 0, 0), [0, 0, 0, 0xFF]);
    }

    #[test]
    fn mode4_page_flip_selects_the_high_page() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4 | 1 << 4 | 1 << 10;
        lcd.palette_ram[2] = 0xFF; // palette 1 = white-ish
        lcd.palette_ram[3] = 0x7F;
        lcd.video_ram[0xA000] = 1;

        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 0, 0), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn mode0_text_background_tile() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 0 | 1 << 8; // mode 0, BG0 on
        lcd.bgcnt[0] = 2 << 8; // char base 0, screen block at 0x1000, 4bpp, 256x256

        // tile 1: all pixels use color 1 of palette bank 0
        for i in 0..32 {
            lcd.video_ram[32 + i] = 0x11;
        }
        // map entry (0,0) -> tile 1
        lcd.video_ram[0x1000] = 1;
        lcd.video_ram[0x1001] = 0;
        // palette color 1 = blue (0x7C00)
        lcd.palette_ram[2] = 0x00;
        lcd.palette_ram[3] = 0x7C;

        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 0, 0), [0, 0, 0xFF, 0xFF]);
        // the neighbouring tile is transparent -> backdrop (palette 0 = black)
        assert_eq!(pixel(&lcd, 8, 0), [0, 0, 0, 0xFF]);
    }

    #[test]
    fn oam_writes_only_take_effect_at_the_frame_wrap_snapshot() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4 | 1 << 12; // mode 4, OBJ on
        // the all-zero snapshot describes an enabled 8x8 sprite at (0,0)
        // using tile 0; make that tile solid color 1 (sprite palette red)
        lcd.palette_ram[0x202] = 0x1F;
        lcd.palette_ram[0x203] = 0x00;
        for i in 0..32 {
            lcd.video_ram[0x14000 + i] = 0x11;
        }

        // disable sprite 0 in OAM before anything renders: the working
        // snapshot still shows it for the whole current frame
        lcd.object_attribute_memory[1] = 0x02;
        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 0, 0), [0xFF, 0, 0, 0xFF]);

        // the wrap at line 227->0 re-snapshots OAM; the sprite is gone
        run_scanlines(&mut lcd, 227);
        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 0, 0), [0, 0, 0, 0xFF]);
    }

    #[test]
    fn sprite_horizontal_flip() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4 | 1 << 12;
        // tile: left half color 1, right half color 2 (4bpp, two pixels per byte)
        for row in 0..8 {
            lcd.video_ram[0x14000 + row * 4] = 0x11;
            lcd.video_ram[0x14000 + row * 4 + 1] = 0x11;
            lcd.video_ram[0x14000 + row * 4 + 2] = 0x22;
            lcd.video_ram[0x14000 + row * 4 + 3] = 0x22;
        }
        lcd.palette_ram[0x202] = 0x1F; // color 1 red
        lcd.palette_ram[0x204] = 0xE0; // color 2 green
        lcd.palette_ram[0x205] = 0x03;
        // attr1: HFlip
        lcd.object_attribute_memory[2] = 0x00;
        lcd.object_attribute_memory[3] = 0x10;

        run_scanlines(&mut lcd, 229);
        assert_eq!(pixel(&lcd, 0, 0), [0, 0xFF, 0, 0xFF]);
        assert_eq!(pixel(&lcd, 7, 0), [0xFF, 0, 0, 0xFF]);
    }

    #[test]
    fn lower_oam_index_wins_priority_ties() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4 | 1 << 12;
        for i in 0..32 {
            lcd.video_ram[0x14000 + i] = 0x11; // tile 0 color 1
            lcd.video_ram[0x14000 + 64 + i] = 0x22; // tile 2 color 2
        }
        lcd.palette_ram[0x202] = 0x1F; // red
        lcd.palette_ram[0x204] = 0xE0; // green
        lcd.palette_ram[0x205] = 0x03;
        // sprite 0 uses tile 0, sprite 1 uses tile 2, same position/priority
        lcd.object_attribute_memory[8 + 4] = 2;

        run_scanlines(&mut lcd, 229);
        assert_eq!(pixel(&lcd, 0, 0), [0xFF, 0, 0, 0xFF]);
    }

    #[test]
    fn affine_background_identity_matrix() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 1 | 1 << 10; // mode 1, BG2 on
        lcd.bgcnt[2] = 2 << 8; // map at 0x1000, char at 0, 128x128
        lcd.bg_affine[0].pa = 0x0100; // 1.0
        lcd.bg_affine[0].pd = 0x0100;

        // tile 1 (256-color, 64 bytes) filled with color 1
        for i in 0..64 {
            lcd.video_ram[64 + i] = 1;
        }
        lcd.video_ram[0x1000] = 1; // map entry (0,0) -> tile 1
        lcd.palette_ram[2] = 0x1F; // color 1 red

        run_scanlines(&mut lcd, 1);
        assert_eq!(pixel(&lcd, 0, 0), [0xFF, 0, 0, 0xFF]);
        assert_eq!(pixel(&lcd, 8, 0), [0, 0, 0, 0xFF]);
    }

    #[test]
    fn affine_background_out_of_range_is_transparent_without_wrap() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 1 | 1 << 10;
        lcd.bgcnt[2] = 2 << 8;
        lcd.bg_affine[0].pa = 0x0100;
        lcd.bg_affine[0].pd = 0x0100;
        lcd.bg_affine[0].x = 0x0FFF_8000; // reference point -128.0 pixels

        lcd.palette_ram[0] = 0xE0; // backdrop green
        lcd.palette_ram[1] = 0x03;

        run_scanlines(&mut lcd, 1);
        // the whole line samples u < 0 -> transparent -> backdrop
        assert_eq!(pixel(&lcd, 0, 0), [0, 0xFF, 0, 0xFF]);
    }
}
