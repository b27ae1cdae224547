#![cfg(unix)]

use std::process::Command;
use std::time::Duration;
use vitals::shutdown::shutdown_signal;

async fn raise_and_wait(flag: &str) -> &'static str {
    let waiter = tokio::spawn(shutdown_signal());
    // let the task register its handlers before the signal is sent
    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = Command::new("kill")
        .args([flag, &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("signal was not observed")
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hangup_and_quit_end_the_wait_instead_of_the_process() {
    assert_eq!(raise_and_wait("-HUP").await, "SIGHUP");
    assert_eq!(raise_and_wait("-QUIT").await, "SIGQUIT");
    assert_eq!(raise_and_wait("-TERM").await, "SIGTERM");
}
