//! The demodulator: noisy composite back to RGB. Acquires vertical and
//! horizontal sync by integration, locks the color carrier against the
//! convergence accumulator, mixes out YIQ per sample and rasterizes into
//! the output buffer.

use super::Crt;
use crate::{
    signal::{
        posmod, AV_BEG, AV_LEN, BLACK_LEVEL, CB_BEG, CB_CYCLES, CRT_BOT, CRT_CB_FREQ,
        CRT_CC_SAMPLES, CRT_CC_VPER, CRT_DO_BLOOM, CRT_DO_HSYNC, CRT_DO_VSYNC, CRT_HRES,
        CRT_HSYNC_THRESH, CRT_HSYNC_WINDOW, CRT_INPUT_SIZE, CRT_LINES, CRT_TOP, CRT_VRES,
        CRT_VSYNC_THRESH, CRT_VSYNC_WINDOW, SYNC_BEG, SYNC_LEVEL,
    },
    trig::sincos14,
};

/// Fixed alignment nudges between acquired sync and the sampling raster.
const XNUDGE: i32 = -3;
const YNUDGE: i32 = 3;

#[derive(Default, Debug, Copy, Clone)]
struct Yiq {
    y: i32,
    i: i32,
    q: i32,
}

impl Crt {
    /// Demodulate the composite signal produced by [`Crt::modulate`] into
    /// the output raster, mixing in `noise` first.
    pub fn demodulate(&mut self, noise: i32) {
        let bpp = self.out_format.bpp();
        if self.outw <= 0 || self.outh <= 0 {
            return;
        }
        let pitch = self.outw as usize * bpp;
        if self.out.len() < pitch * self.outh as usize {
            return;
        }

        let (mut huesn, mut huecs) = sincos14(((self.hue % 360) + 33) * 8192 / 180);
        huesn >>= 11; /* make 4-bit */
        huecs >>= 11;

        let bright = self.brightness - (BLACK_LEVEL + self.black_point);

        /* signal + noise */
        let mut rn = self.rn;
        for i in 0..CRT_INPUT_SIZE {
            rn = rn.wrapping_mul(214019).wrapping_add(140_327_895);
            let s = i32::from(self.analog[i]) + (((rn >> 16 & 0xff) as i32 - 0x7f) * noise >> 8);
            self.inp[i] = s.clamp(-127, 127) as i8;
        }
        self.rn = rn;

        // Look for vertical sync by integrating the signal until it drops
        // below a threshold. The vsync pulse is much longer than hsync, so
        // its threshold is much larger; integration rides over the noise.
        let mut crossing = None;
        'search: for i in -CRT_VSYNC_WINDOW..CRT_VSYNC_WINDOW {
            let line = posmod(self.vsync + i, CRT_VRES);
            let base = (line * CRT_HRES) as usize;
            let mut s = 0;
            for j in 0..CRT_HRES {
                s += i32::from(self.inp[base + j as usize]);
                if s <= CRT_VSYNC_THRESH * SYNC_LEVEL {
                    crossing = Some((line, j));
                    break 'search;
                }
            }
        }
        // A crossing past the half line means the pulse started late: odd
        // field. No crossing at all keeps the previous vsync and assumes
        // even.
        let mut field = 0;
        match crossing {
            Some((line, j)) => {
                if CRT_DO_VSYNC {
                    self.vsync = line;
                }
                field = i32::from(j > CRT_HRES / 2);
                log::trace!("vsync at line {line}, column {j}");
            }
            None => log::trace!("vsync not found, keeping line {}", self.vsync),
        }
        if !CRT_DO_VSYNC {
            self.vsync = -3;
        }

        /* bloom emulation */
        let max_e = (128 + noise / 2) * AV_LEN; /* approx max energy in a line */
        let mut prev_e = 16384 / 8; /* filtered beam energy per line */

        /* ratio of output height to active video lines in the signal */
        let ratio = ((self.outh << 16) / CRT_LINES + 32768) >> 16;
        let field = field * (ratio / 2);

        let mut decoded = [Yiq::default(); AV_LEN as usize + 1];

        for line in CRT_TOP..CRT_BOT {
            let beg = (line - CRT_TOP) * (self.outh + self.v_fac) / CRT_LINES + field;
            let end = (line - CRT_TOP + 1) * (self.outh + self.v_fac) / CRT_LINES + field;
            if beg >= self.outh {
                continue;
            }
            let end = end.min(self.outh);

            // Horizontal sync, same integration idea as vertical.
            let ln = (posmod(line + self.vsync, CRT_VRES) * CRT_HRES) as usize;
            let base = ln + self.hsync as usize;
            let mut s = 0;
            let mut run = CRT_HSYNC_WINDOW;
            for i in -CRT_HSYNC_WINDOW..CRT_HSYNC_WINDOW {
                s += i32::from(self.inp[(base + (SYNC_BEG + i) as usize) % CRT_INPUT_SIZE]);
                if s <= CRT_HSYNC_THRESH * SYNC_LEVEL {
                    run = i;
                    break;
                }
            }
            if CRT_DO_HSYNC {
                self.hsync = posmod(run + self.hsync, CRT_HRES);
            } else {
                self.hsync = 0;
            }

            let xpos = posmod(AV_BEG + self.hsync + XNUDGE, CRT_HRES);
            let ypos = posmod(line + self.vsync + YNUDGE, CRT_VRES);
            let pos = (xpos + ypos * CRT_HRES) as usize;

            // Blend the burst into the convergence accumulator; a fraction
            // of the previous value mixed with the new sample denoises the
            // phase reference across frames.
            let vper = ypos as usize % CRT_CC_VPER;
            let cc_base = ln + (self.hsync & !3) as usize;
            for i in CB_BEG..CB_BEG + CB_CYCLES * CRT_CB_FREQ {
                let idx = (i % CRT_CC_SAMPLES as i32) as usize;
                let p = self.ccf[vper][idx] * 127 / 128;
                let n = i32::from(self.inp[(cc_base + i as usize) % CRT_INPUT_SIZE]);
                self.ccf[vper][idx] = p + n;
            }

            let ccr = &self.ccf[vper];
            let phasealign = posmod(self.hsync, CRT_CC_SAMPLES as i32) as usize;

            /* amplitude of carrier = saturation, phase difference = hue */
            let dci = ccr[(phasealign + 1) & 3] - ccr[(phasealign + 3) & 3];
            let dcq = ccr[(phasealign + 2) & 3] - ccr[phasealign & 3];

            let mut wave = [0; CRT_CC_SAMPLES];
            wave[0] = ((dci * huecs - dcq * huesn) >> 4) * self.saturation;
            wave[1] = ((dcq * huecs + dci * huesn) >> 4) * self.saturation;
            wave[2] = -wave[0];
            wave[3] = -wave[1];

            let (dx, scan_l, scan_r) = if CRT_DO_BLOOM {
                let mut e = 0;
                for i in 0..AV_LEN {
                    e += i32::from(self.inp[(pos + i as usize) % CRT_INPUT_SIZE]);
                }
                // Bright lines widen the beam.
                prev_e = prev_e * 123 / 128 + (((max_e >> 1) - e) << 10) / max_e;
                let line_w = AV_LEN * 112 / 128 + (prev_e >> 9);
                (
                    (line_w << 12) / self.outw,
                    (AV_LEN / 2 - (line_w >> 1) + 8) << 12,
                    (AV_LEN - 1) << 12,
                )
            } else {
                (
                    ((AV_LEN - 1) << 12) / self.outw,
                    0,
                    (AV_LEN - 1) << 12,
                )
            };
            let l = scan_l >> 12;
            let r = if CRT_DO_BLOOM { scan_r >> 12 } else { AV_LEN };

            self.eq_y.reset();
            self.eq_i.reset();
            self.eq_q.reset();

            for i in l..r {
                let sig = i32::from(self.inp[(pos + i as usize) % CRT_INPUT_SIZE]);
                let w = i as usize & 3;
                let cell = &mut decoded[i as usize];
                cell.y = self.eq_y.filter(sig + bright) << 4;
                cell.i = self.eq_i.filter(sig * wave[w] >> 9) >> 3;
                /* Q is demodulated with a 3-sample lag */
                cell.q = self.eq_q.filter(sig * wave[(w + 3) & 3] >> 9) >> 3;
            }

            let format = self.out_format;
            let blend = self.blend;
            let contrast = self.contrast;
            let row = &mut self.out[beg as usize * pitch..beg as usize * pitch + pitch];

            let mut ci = 0;
            let mut pos = scan_l;
            while pos < scan_r && ci + bpp <= pitch {
                /* interpolate between samples if needed */
                let rr = pos & 0xfff;
                let ll = 0xfff - rr;
                let s = (pos >> 12) as usize;
                let a = decoded[s];
                let b = decoded[s + 1];
                let y = ((a.y * ll) >> 2) + ((b.y * rr) >> 2);
                let i = ((a.i * ll) >> 14) + ((b.i * rr) >> 14);
                let q = ((a.q * ll) >> 14) + ((b.q * rr) >> 14);

                /* YIQ to RGB */
                let r = ((((y + 3879 * i + 2556 * q) >> 12) * contrast) >> 8).clamp(0, 255);
                let g = ((((y - 1126 * i - 2605 * q) >> 12) * contrast) >> 8).clamp(0, 255);
                let b = ((((y - 4530 * i + 7021 * q) >> 12) * contrast) >> 8).clamp(0, 255);

                let px = &mut row[ci..ci + bpp];
                let mut aa = (r << 16 | g << 8 | b) as u32;
                if blend {
                    let (pr, pg, pb) = format.read_rgb(px);
                    let bb = u32::from(pr) << 16 | u32::from(pg) << 8 | u32::from(pb);
                    /* blend with the color previously there */
                    aa = ((aa & 0xfefeff) >> 1) + ((bb & 0xfefeff) >> 1);
                }
                format.write_rgb(px, (aa >> 16) as u8, (aa >> 8) as u8, aa as u8);

                ci += bpp;
                pos += dx;
            }

            /* duplicate extra lines */
            for dup in beg + 1..end - self.scanlines {
                let (above, below) = self.out.split_at_mut(dup as usize * pitch);
                below[..pitch].copy_from_slice(&above[(dup as usize - 1) * pitch..][..pitch]);
            }
        }
    }
}
