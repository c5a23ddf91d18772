use mt32drv_ports::types::{ChannelId, ChannelMask, CHANNEL_COUNT};

/// Tracks which logical channels are handed out.
///
/// Allocation scans 0..=15 in ascending order and takes the first free,
/// enabled channel, so identical allocate/release histories always produce
/// identical assignments. Channel 9 is never handed out here.
#[derive(Clone, Debug)]
pub struct ChannelAllocator {
    allocated: [bool; CHANNEL_COUNT],
    mask: ChannelMask,
}

impl ChannelAllocator {
    pub fn new(mask: ChannelMask) -> Self {
        Self {
            allocated: [false; CHANNEL_COUNT],
            mask,
        }
    }

    pub fn allocate(&mut self) -> Option<ChannelId> {
        for index in 0..CHANNEL_COUNT as u8 {
            let channel = ChannelId::new(index)?;
            if channel.is_percussion() || !self.mask.contains(channel) {
                continue;
            }
            let slot = &mut self.allocated[index as usize];
            if !*slot {
                *slot = true;
                return Some(channel);
            }
        }
        None
    }

    /// Returns a channel to the pool. Releasing the percussion channel is a no-op.
    pub fn release(&mut self, channel: ChannelId) {
        if channel.is_percussion() {
            return;
        }
        self.allocated[channel.index() as usize] = false;
    }

    pub fn percussion(&self) -> ChannelId {
        ChannelId::percussion()
    }

    /// Only gates later `allocate` calls; channels already out stay out.
    pub fn set_mask(&mut self, mask: ChannelMask) {
        self.mask = mask;
    }

    pub fn mask(&self) -> ChannelMask {
        self.mask
    }

    pub fn is_allocated(&self, channel: ChannelId) -> bool {
        self.allocated[channel.index() as usize]
    }

    pub fn reset(&mut self) {
        self.allocated = [false; CHANNEL_COUNT];
    }
}

impl Default for ChannelAllocator {
    fn default() -> Self {
        Self::new(ChannelMask::ALL)
    }
}
