//! Bit-flag sets returned by the status queries of the SPCM DLL.
//!
//! The DLL reports these as `short` values. They are reinterpreted as `u16` so the
//! top bit can be named like any other. Bits that no flag names are kept, and some bits
//! carry different meanings depending on the module family; both meanings are listed and
//! no attempt is made to pick one.

spcm_flags! {
    /// Measurement state, as returned by `SPC_test_state`.
    pub struct MeasurementState: u16 {
        /// Stopped on overflow.
        const STOPPED_ON_OVERFLOW = 0x1 => "SPC_OVERFL";
        /// Overflow occurred.
        const OVERFLOW = 0x2 => "SPC_OVERFLOW";
        /// Stopped on expiry of the collection timer.
        const STOPPED_ON_COLLECTION_TIMER = 0x4 => "SPC_TIME_OVER";
        const COLLECTION_TIMER_EXPIRED = 0x8 => "SPC_COLTIM_OVER";
        const STOPPED_ON_COMMAND = 0x10 => "SPC_CMD_STOP";
        const REPEAT_TIMER_EXPIRED = 0x20 => "SPC_REPTIM_OVER";
        /// Sequencer waiting for the other memory bank to be armed.
        const SEQUENCER_GAP = 0x40 => "SPC_SEQ_GAP";
        /// Same bit as `SEQUENCER_GAP` on SPC-140/150/830/930 and newer modules.
        const MEASUREMENT_ACTIVE = 0x40 => "SPC_MEASURE";
        /// Measurement in progress (current bank).
        const ARMED = 0x80 => "SPC_ARMED";
        const COLLECTION_TIMER_SECOND_OVERFLOW = 0x100 => "SPC_COLTIM_2OVER";
        const REPEAT_TIMER_SECOND_OVERFLOW = 0x200 => "SPC_REPTIM_2OVER";
        /// FIFO overflow, data lost.
        const FIFO_OVERFLOW = 0x400 => "SPC_FOVFL";
        const FIFO_EMPTY = 0x800 => "SPC_FEMPTY";
        const WAITING_FOR_TRIGGER = 0x1000 => "SPC_WAIT_TRG";
        /// Waiting for the first frame clock in imaging modes.
        const WAITING_FOR_FRAME = 0x2000 => "SPC_WAIT_FR";
        const SEQUENCER_STOPPED = 0x4000 => "SPC_SEQ_STOP";
        /// Histogram fill not ready (SPC-160/180 only).
        const HISTOGRAM_FILL_NOT_READY = 0x8000 => "SPC_HFILL_NRDY";
    }
}

spcm_flags! {
    /// Sync input state, as returned by `SPC_get_sync_state`.
    pub struct SyncState: u16 {
        const SYNC_OK = 0x1 => "SYNC_OK";
        const SYNC_OVERLOAD = 0x2 => "SYNC_OVERLOAD";
    }
}

spcm_flags! {
    /// Properties of the FIFO data stream (`stream_type` of `SPC_get_fifo_init_vars`).
    pub struct StreamType: u16 {
        const BH_STREAM = 0x1 => "BH_STREAM";
        const FREE_BUF_STREAM = 0x2 => "FREE_BUF_STREAM";
        const RAW_DATA = 0x4 => "RAW_DATA";
        const HAS_MARKERS = 0x8 => "HAS_MARKERS";
        const HAS_SPC_HEADER = 0x100 => "HAS_SPC_HEADER";
    }
}

/// Vendor macro name for a [`MeasurementState`] flag name, e.g. `FIFO_OVERFLOW` -> `SPC_FOVFL`.
pub fn measurement_state_bh_name(name: &str) -> Option<&'static str> {
    MeasurementState::bh_name(name)
}

#[cfg(test)]
mod test {
    use crate::flags::*;

    #[test]
    fn bh_names() {
        assert_eq!(measurement_state_bh_name("FIFO_OVERFLOW"), Some("SPC_FOVFL"));
        assert_eq!(measurement_state_bh_name("SEQUENCER_GAP"), Some("SPC_SEQ_GAP"));
        assert_eq!(measurement_state_bh_name("NOT_A_FLAG"), None);
    }

    #[test]
    fn contains_and_unknown_bits() {
        let state = MeasurementState::from_bits_retain(0x80 | 0x800);
        assert!(state.contains(MeasurementState::ARMED));
        assert!(state.contains(MeasurementState::FIFO_EMPTY));
        assert!(!state.contains(MeasurementState::FIFO_OVERFLOW));
        assert_eq!(state.unknown_bits(), 0);
        assert_eq!(state.names(), vec!["ARMED", "FIFO_EMPTY"]);

        let sync = SyncState::from_bits_retain(0x1 | 0x40);
        assert!(sync.contains(SyncState::SYNC_OK));
        assert_eq!(sync.unknown_bits(), 0x40);
        assert_eq!(sync.bits(), 0x41);
    }

    #[test]
    fn overloaded_bit_reports_every_meaning() {
        let state = MeasurementState::from(0x40);
        assert!(state.contains(MeasurementState::SEQUENCER_GAP));
        assert!(state.contains(MeasurementState::MEASUREMENT_ACTIVE));
        assert_eq!(
            format!("{:?}", state),
            "MeasurementState(SEQUENCER_GAP | MEASUREMENT_ACTIVE)"
        );
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", SyncState::empty()), "SyncState(empty)");
        assert_eq!(
            format!("{:?}", StreamType::BH_STREAM | StreamType::from_bits_retain(0x4000)),
            "StreamType(BH_STREAM | 0x4000)"
        );
        let mut stream = StreamType::empty();
        stream |= StreamType::HAS_SPC_HEADER;
        assert!(stream.contains(StreamType::HAS_SPC_HEADER));
        assert!(!stream.is_empty());
    }
}
