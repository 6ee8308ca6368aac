use crate::{code_of, request, Fixture, START};

use login_server::maintenance::LeaderMaintenance;
use login_server::util::Config;
use login_server::wait_level::Admission;

use common::proto::login_service::ResultCode;

/// 窗口2人，一个统计周期一个时间片
fn small_window() -> Config {
    Config {
        login_window_size: 2,
        login_time_slice: 60,
        login_timestamp_mcu: 60,
        ..Default::default()
    }
}

#[tokio::test]
async fn queue_drains_in_arrival_order() {
    let fixture = Fixture::new(small_window());
    let calc = &fixture.dispatcher.calculator;

    assert!(calc.evaluate("a").await.unwrap().admitted());
    assert!(calc.evaluate("b").await.unwrap().admitted());
    assert_eq!(
        calc.evaluate("c").await.unwrap(),
        Admission {
            wait_level: 1,
            wait_time: 5,
            rank: 1
        }
    );
    // 同一秒入队时等待时间短的在前，推进一秒保证顺序
    fixture.clock.advance(1);
    assert_eq!(
        calc.evaluate("d").await.unwrap(),
        Admission {
            wait_level: 2,
            wait_time: 5,
            rank: 2
        }
    );

    let info = calc.queue().rank("c").await.unwrap().unwrap();
    assert_eq!((info.timestamp, info.wait_time), (START, 5));

    // 同一时间片内重试，累计等待时间，位置不变
    fixture.clock.advance(2);
    assert!(!calc.evaluate("c").await.unwrap().admitted());
    let info = calc.queue().rank("c").await.unwrap().unwrap();
    assert_eq!((info.rank, info.timestamp, info.wait_time), (1, START, 8));

    // 下个时间片按排名放行
    fixture.clock.advance(60);
    let admission = calc.evaluate("c").await.unwrap();
    assert!(admission.admitted());
    assert_eq!(admission.rank, 1);
    let admission = calc.evaluate("d").await.unwrap();
    assert!(admission.admitted());
    assert_eq!(calc.queue().len().await.unwrap(), 0);
}

#[tokio::test]
async fn leader_sweeps_abandoned_members() {
    let fixture = Fixture::new(small_window());
    let calc = &fixture.dispatcher.calculator;
    for account in ["a", "b", "gone"] {
        calc.evaluate(account).await.unwrap();
    }
    assert_eq!(calc.queue().len().await.unwrap(), 1);
    assert!(fixture.dispatcher.is_leader());

    // 入队5秒后重试，再宽限30秒
    fixture.clock.advance(35);
    assert_eq!(fixture.dispatcher.maintenance_once().await.swept, 0);

    fixture.clock.advance(1);
    let report = fixture.dispatcher.maintenance_once().await;
    assert_eq!(report.swept, 1);
    assert_eq!(report.queue_len, 0);
    assert_eq!(fixture.dispatcher.metrics.snapshot().swept, 1);
}

#[tokio::test]
async fn only_leader_maintains() {
    let fixture = Fixture::new(Config {
        process_id: 2,
        ..Default::default()
    });
    assert!(!fixture.dispatcher.is_leader());
    // 非leader直接返回
    fixture.dispatcher.clone().maintenance_monitor().await;
}

#[tokio::test]
async fn store_down_fails_closed() {
    let fixture = Fixture::with_zone(Config::default()).await;
    fixture.store.set_available(false);

    let reply = fixture.login(request("u1")).await;
    assert_eq!(code_of(&reply), Some(ResultCode::LoginBusy));
    assert_eq!(reply.busy_wait_time, 60);
    assert!(reply.ip.is_empty());
    assert!(fixture.dispatcher.metrics.snapshot().store_errors >= 1);

    // 维护任务出错不影响返回
    let report = fixture.dispatcher.maintenance_once().await;
    assert_eq!(report.swept, 0);

    fixture.store.set_available(true);
    let reply = fixture.login(request("u1")).await;
    assert_eq!(code_of(&reply), Some(ResultCode::Succ));
}
