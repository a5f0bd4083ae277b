//! Remote Endpoints
//!
//! URL catalogue for the remote service, one constant per call site.

// ─── Account ─────────────────────────────────────────────────────

pub const NAV_INFO: &str = "https://api.bilibili.com/x/web-interface/nav";
pub const EXP_REWARD_STATUS: &str = "https://api.bilibili.com/x/member/web/exp/reward";
pub const COIN_EXP_TODAY: &str = "https://www.bilibili.com/plus/account/exp.php";
pub const COIN_BALANCE: &str = "https://account.bilibili.com/site/getCoin";
pub const COIN_LOG: &str = "https://api.bilibili.com/x/member/web/coin/log";

// ─── Video ───────────────────────────────────────────────────────

pub const FOLLOWED_FEED: &str =
    "https://api.vc.bilibili.com/dynamic_svr/v1/dynamic_svr/dynamic_new";
pub const REGION_RANKING: &str = "https://api.bilibili.com/x/web-interface/ranking/region";
pub const VIDEO_VIEW: &str = "https://api.bilibili.com/x/web-interface/view";
pub const ARCHIVE_COINS: &str = "https://api.bilibili.com/x/web-interface/archive/coins";
pub const REPORT_HEARTBEAT: &str = "https://api.bilibili.com/x/click-interface/web/heartbeat";
pub const SHARE_VIDEO: &str = "https://api.bilibili.com/x/web-interface/share/add";
pub const DONATE_COIN: &str = "https://api.bilibili.com/x/web-interface/coin/add";

// ─── Manga ───────────────────────────────────────────────────────

pub const MANGA_CLOCK_IN: &str =
    "https://manga.bilibili.com/twirp/activity.v1.Activity/ClockIn";
pub const MANGA_READ: &str =
    "https://manga.bilibili.com/twirp/bookshelf.v1.Bookshelf/AddHistory";

// ─── Live ────────────────────────────────────────────────────────

pub const LIVE_WALLET: &str = "https://api.live.bilibili.com/pay/v2/Pay/myWallet";
pub const SILVER_TO_COIN: &str = "https://api.live.bilibili.com/pay/v1/Exchange/silver2coin";
pub const LIVE_SIGN: &str = "https://api.live.bilibili.com/xlive/web-ucenter/v1/sign/DoSign";
pub const GIFT_BAG_LIST: &str = "https://api.live.bilibili.com/xlive/web-room/v1/gift/bag_list";
pub const LIVE_ROOM_INFO: &str = "https://api.live.bilibili.com/room/v1/Room/getRoomInfoOld";
pub const GIFT_BAG_SEND: &str = "https://api.live.bilibili.com/xlive/revenue/v1/gift/sendBag";

// ─── Charge & Vip ────────────────────────────────────────────────

pub const CHARGE_QUICK_PAY: &str = "https://api.bilibili.com/x/ugcpay/trade/elec/pay/quick";
pub const CHARGE_COMMENT: &str = "https://api.bilibili.com/x/ugcpay/trade/elec/message";
pub const VIP_PRIVILEGE_RECEIVE: &str = "https://api.bilibili.com/x/vip/privilege/receive";
