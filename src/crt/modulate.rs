//! The modulator: RGB source to baseband composite. Every line gets its
//! sync tip and color burst rebuilt; the scaled source lands in the active
//! video region as band-limited YIQ on the quadrature subcarrier.

use super::Crt;
use crate::{
    filter::IirLp,
    signal::{
        cc_phase, PixelFormat, AV_BEG, AV_LEN, BLACK_LEVEL, BLANK_LEVEL, BURST_LEVEL, BW_BEG,
        CB_BEG, CB_CYCLES, CRT_CB_FREQ, CRT_CC_SAMPLES, CRT_CC_VPER, CRT_CHROMA_PATTERN, CRT_HRES,
        CRT_INPUT_SIZE, CRT_LINES, CRT_TOP, CRT_VRES, I_FREQ, L_FREQ, Q_FREQ, SYNC_BEG,
        SYNC_LEVEL, WHITE_LEVEL, Y_FREQ,
    },
    trig::sincos14,
};

/// Per-field input to [`Crt::modulate`]. Borrows the source image for the
/// duration of the call and carries the flags that vary between fields.
#[derive(Debug, Clone)]
#[must_use]
pub struct NtscSettings<'a> {
    /// Source image data in `format` layout, `w * h` pixels.
    pub data: &'a [u8],
    pub format: PixelFormat,
    pub w: i32,
    pub h: i32,
    /// Use the source dimensions directly instead of scaling to the
    /// monitor. Needed for images that rely on artifact colors.
    pub raw: bool,
    /// false = monochrome, true = full color.
    pub as_color: bool,
    /// 0 = even, 1 = odd.
    pub field: i32,
    /// 0 = even, 1 = odd.
    pub frame: i32,
    /// Artifact hue, 0-359.
    pub hue: i32,
    /// X offset in sample space, 0 is the minimum.
    pub xoffset: i32,
    /// Y offset in lines, 0 is the minimum.
    pub yoffset: i32,
    /// One-shot latch: the YIQ band-limit coefficients are derived into the
    /// CRT the first time these settings are used.
    pub iirs_initialized: bool,
}

impl<'a> NtscSettings<'a> {
    pub fn new(data: &'a [u8], format: PixelFormat, w: i32, h: i32) -> Self {
        Self {
            data,
            format,
            w,
            h,
            raw: false,
            as_color: true,
            field: 0,
            frame: 0,
            hue: 0,
            xoffset: 0,
            yoffset: 0,
            iirs_initialized: false,
        }
    }
}

/// Destination rectangle in analog space, roughly 85% of the active region
/// so the image does not crowd sync and blanking. Raw sources keep their own
/// dimensions up to the same maxima.
fn scaled_dest(raw: bool, w: i32, h: i32) -> (i32, i32) {
    let max_w = (AV_LEN * 55500) >> 16;
    let max_h = (CRT_LINES * 63500) >> 16;
    if raw {
        (w.min(max_w), h.min(max_h))
    } else {
        (max_w, max_h)
    }
}

impl Crt {
    /// Modulate an RGB image into the analog NTSC composite signal.
    pub fn modulate(&mut self, s: &mut NtscSettings<'_>) {
        const SYNC: i8 = SYNC_LEVEL as i8;
        const BLANK: i8 = BLANK_LEVEL as i8;

        if !s.iirs_initialized {
            log::debug!("deriving YIQ band-limit coefficients");
            self.iir_y = IirLp::low_pass(L_FREQ, Y_FREQ);
            self.iir_i = IirLp::low_pass(L_FREQ, I_FREQ);
            self.iir_q = IirLp::low_pass(L_FREQ, Q_FREQ);
            s.iirs_initialized = true;
        }

        let bpp = s.format.bpp();
        let (destw, desth) = scaled_dest(s.raw, s.w, s.h);
        if destw <= 0 || desth <= 0 || s.w <= 0 || s.h <= 0 {
            return;
        }
        if s.data.len() < (s.w * s.h) as usize * bpp {
            log::warn!(
                "source too small: {} bytes for {}x{} {}",
                s.data.len(),
                s.w,
                s.h,
                s.format
            );
            return;
        }

        // Quadrature tables for the burst and the I/Q carriers, rotated by
        // the artifact hue. Monochrome leaves them zeroed, which erases the
        // burst and the chroma term entirely.
        let mut ccmod_i = [0i32; CRT_CC_SAMPLES];
        let mut ccmod_q = [0i32; CRT_CC_SAMPLES];
        let mut ccburst = [0i32; CRT_CC_SAMPLES];
        if s.as_color {
            for x in 0..CRT_CC_SAMPLES {
                let n = s.hue + x as i32 * (360 / CRT_CC_SAMPLES as i32);
                let (sn, _) = sincos14((n + 33) * 8192 / 180);
                ccburst[x] = sn >> 10;
                let (sn, _) = sincos14(n * 8192 / 180);
                ccmod_i[x] = sn >> 10;
                let (sn, _) = sincos14((n - 90) * 8192 / 180);
                ccmod_q[x] = sn >> 10;
            }
        }

        let mut xo = AV_BEG + s.xoffset.max(0) + (AV_LEN - destw) / 2;
        let yo = CRT_TOP + s.yoffset.max(0) + (CRT_LINES - desth) / 2;

        let field = s.field & 1;
        let frame = s.frame & 1;
        let inv_phase = i32::from(field == frame);
        let ph = cc_phase(inv_phase);

        /* align signal with the chroma period */
        xo &= !3;

        let mut iccf = [0i32; CRT_CC_SAMPLES];
        for n in 0..CRT_VRES {
            let base = (n * CRT_HRES) as usize;
            let line = &mut self.analog[base..base + CRT_HRES as usize];

            if n <= 3 || (7..=9).contains(&n) {
                // Equalizing pulses: small blips of sync, mostly blank.
                let p4 = (4 * CRT_HRES / 100) as usize;
                let p50 = (50 * CRT_HRES / 100) as usize;
                let p54 = (54 * CRT_HRES / 100) as usize;
                line[..p4].fill(SYNC);
                line[p4..p50].fill(BLANK);
                line[p50..p54].fill(SYNC);
                line[p54..].fill(BLANK);
            } else if (4..=6).contains(&n) {
                // Vertical sync pulse: small blips of blank, mostly sync.
                // The odd field starts the pulse a half line early; the
                // receiver's integrator tells the fields apart by it.
                let offs: [i32; 4] = if field == 1 {
                    [4, 50, 96, 100]
                } else {
                    [46, 50, 96, 100]
                };
                let o0 = (offs[0] * CRT_HRES / 100) as usize;
                let o1 = (offs[1] * CRT_HRES / 100) as usize;
                let o2 = (offs[2] * CRT_HRES / 100) as usize;
                let o3 = (offs[3] * CRT_HRES / 100) as usize;
                line[..o0].fill(SYNC);
                line[o0..o1].fill(BLANK);
                line[o1..o2].fill(SYNC);
                line[o2..o3].fill(BLANK);
            } else {
                // Video line.
                line[..SYNC_BEG as usize].fill(BLANK); /* FP */
                line[SYNC_BEG as usize..BW_BEG as usize].fill(SYNC); /* SYNC */
                line[BW_BEG as usize..AV_BEG as usize].fill(BLANK); /* BW + CB + BP */
                if n < CRT_TOP {
                    line[AV_BEG as usize..].fill(BLANK);
                }

                // CB_CYCLES of color burst at 3.579545 MHz.
                for t in CB_BEG..CB_BEG + CB_CYCLES * CRT_CB_FREQ {
                    let cb = if CRT_CHROMA_PATTERN == 1 {
                        let off180 = (CRT_CC_SAMPLES / 2) as i32;
                        ccburst[((t + inv_phase * off180) % CRT_CC_SAMPLES as i32) as usize]
                    } else {
                        ccburst[(t % CRT_CC_SAMPLES as i32) as usize]
                    };
                    line[t as usize] = ((BLANK_LEVEL + cb * BURST_LEVEL) >> 5) as i8;
                    iccf[(t % CRT_CC_SAMPLES as i32) as usize] = i32::from(line[t as usize]);
                }
            }
        }

        for y in 0..desth {
            // Odd fields read from rows offset by half a line.
            let field_offset = (field * s.h + desth) / desth / 2;
            let sy = ((y * s.h) / desth + field_offset).clamp(0, s.h - 1);
            let row = sy * s.w;

            self.iir_y.reset();
            self.iir_i.reset();
            self.iir_q.reset();

            for x in 0..destw {
                let sx = (x * s.w) / destw;
                let pix = &s.data[(row + sx) as usize * bpp..];
                let (r, g, b) = s.format.read_rgb(pix);
                let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));

                /* RGB to YIQ */
                let fy = (19595 * r + 38470 * g + 7471 * b) >> 14;
                let fi = (39059 * r - 18022 * g - 21103 * b) >> 14;
                let fq = (13894 * r - 34275 * g + 20382 * b) >> 14;

                let xoff = ((x + xo) % CRT_CC_SAMPLES as i32) as usize;
                /* bandlimit Y, I, Q */
                let fy = self.iir_y.filter(fy);
                let fi = self.iir_i.filter(fi) * ph * ccmod_i[xoff] >> 4;
                let fq = self.iir_q.filter(fq) * ph * ccmod_q[xoff] >> 4;

                let mut ire = BLACK_LEVEL + self.black_point;
                ire += (fy + fi + fq) * (WHITE_LEVEL * self.white_point / 100) >> 10;
                let ire = ire.clamp(0, 110);

                self.analog[(((x + xo) + (y + yo) * CRT_HRES) as usize) % CRT_INPUT_SIZE] =
                    ire as i8;
            }
        }

        // Broadcast the clean burst reference as the demodulator's phase
        // seed.
        for n in 0..CRT_CC_VPER {
            for x in 0..CRT_CC_SAMPLES {
                self.ccf[n][x] = iccf[x] << 7;
            }
        }
    }
}
