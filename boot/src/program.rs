//! 两个状态机的程序。
//!
//! 引脚约定：`wait pin 0` 看 IN_BASE（时钟），`jmp pin` 看片选，
//! `out`/`set` 都只动数据线。

use pio::Program;

/// 片选有效时数时钟上升沿，X 数到零的那个沿置位 IRQ 0。
pub fn transfer_start() -> Program<32> {
    pio_proc::pio_asm!(
        "count:",
        "    wait 0 pin 0",
        "    wait 1 pin 0",
        "    jmp pin count",
        "    jmp x-- count",
        "    irq set 0",
        "park:",
        "    jmp park"
    )
    .program
}

/// 等 IRQ 0 后接管数据线，时钟低时移出一位，共 Y + 1 位，
/// 之后释放数据线并置位 IRQ 1。
pub fn clocked_output() -> Program<32> {
    pio_proc::pio_asm!(
        "    wait 1 irq 0",
        "    set pindirs, 1",
        "bit:",
        "    wait 0 pin 0",
        "    out pins, 1",
        "    wait 1 pin 0",
        "    jmp y-- bit",
        "    set pindirs, 0",
        "    irq set 1",
        "park:",
        "    jmp park"
    )
    .program
}
